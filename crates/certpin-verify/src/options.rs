//! Verification policy.

use certpin_core::{normalize_hex, Fingerprint};
use rustls::pki_types::CertificateDer;

/// What a [`PeerCertificateVerifier`](crate::PeerCertificateVerifier) checks.
///
/// Built with consuming setters applied in order; a later call overrides
/// an earlier one for the same field.
#[derive(Debug, Clone)]
pub struct VerificationOptions {
    /// Skip chain and validity-period checks entirely
    pub skip_chain_verify: bool,

    /// Expected subject name of the leaf (checked only when set)
    pub dns_name: Option<String>,

    /// Pinned SHA-1 fingerprint of the leaf, canonical hex
    pub fingerprint_sha1: Option<String>,

    /// Load the platform's root certificates
    pub native_roots: bool,

    /// Extra trusted roots, DER encoded
    pub extra_roots: Vec<CertificateDer<'static>>,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationOptions {
    /// Verify the chain against platform roots, no name check, no pin
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skip_chain_verify: false,
            dns_name: None,
            fingerprint_sha1: None,
            native_roots: true,
            extra_roots: Vec::new(),
        }
    }

    /// Skip chain verification
    #[must_use]
    pub fn skip_chain_verify(mut self) -> Self {
        self.skip_chain_verify = true;
        self
    }

    /// Set whether chain verification is skipped
    #[must_use]
    pub fn set_skip_chain_verify(mut self, skip: bool) -> Self {
        self.skip_chain_verify = skip;
        self
    }

    /// Require the leaf to be valid for `name`
    #[must_use]
    pub fn dns_name(mut self, name: impl Into<String>) -> Self {
        self.dns_name = Some(name.into());
        self
    }

    /// Pin the leaf's SHA-1 fingerprint.
    ///
    /// Accepts colon-separated or bare hex in any case. An empty string
    /// clears the pin.
    #[must_use]
    pub fn fingerprint_sha1(mut self, hex: impl AsRef<str>) -> Self {
        let canonical = normalize_hex(hex.as_ref().trim());
        self.fingerprint_sha1 = (!canonical.is_empty()).then_some(canonical);
        self
    }

    /// Pin a validated fingerprint
    #[must_use]
    pub fn pin(mut self, fingerprint: &Fingerprint) -> Self {
        self.fingerprint_sha1 = Some(fingerprint.as_str().to_string());
        self
    }

    /// Enable or disable platform roots
    #[must_use]
    pub fn native_roots(mut self, enabled: bool) -> Self {
        self.native_roots = enabled;
        self
    }

    /// Trust an extra root certificate
    #[must_use]
    pub fn add_root(mut self, root: CertificateDer<'static>) -> Self {
        self.extra_roots.push(root);
        self
    }

    /// Trust several extra root certificates
    #[must_use]
    pub fn add_roots(mut self, roots: impl IntoIterator<Item = CertificateDer<'static>>) -> Self {
        self.extra_roots.extend(roots);
        self
    }

    /// Returns true if nothing would be checked beyond parsing
    #[must_use]
    pub const fn checks_nothing(&self) -> bool {
        self.skip_chain_verify && self.fingerprint_sha1.is_none()
    }
}
