//! Dial options.

use std::time::Duration;

use certpin_verify::{CertificateDer, VerificationOptions};

/// Deadline for the race when no trial-connect timeout is set
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Options passed through to the [`Transport`](crate::Transport)
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Name presented for SNI and hostname checks; defaults to the host part of the address
    pub server_name: Option<String>,
    /// Set `TCP_NODELAY` on the socket
    pub nodelay: bool,
}

/// How a [`DialOrchestrator`](crate::DialOrchestrator) connects.
#[derive(Debug, Clone)]
pub struct DialOptions {
    /// Connect without TLS
    pub plain_text: bool,

    /// Probe the address with a bare connect first; also bounds the race
    pub trial_connect_timeout: Option<Duration>,

    /// Bound on the race when `trial_connect_timeout` is not set
    pub handshake_timeout: Duration,

    /// Skip chain verification of the peer certificate
    pub skip_tls_verify: bool,

    /// Pinned SHA-1 fingerprint of the peer's leaf certificate
    pub fingerprint: Option<String>,

    /// Expected subject name of the peer certificate
    pub dns_name: Option<String>,

    /// Trust the platform's root certificates
    pub native_roots: bool,

    /// Extra trusted roots
    pub extra_roots: Vec<CertificateDer<'static>>,

    /// Transport pass-through options
    pub transport: TransportOptions,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            plain_text: false,
            trial_connect_timeout: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            skip_tls_verify: false,
            fingerprint: None,
            dns_name: None,
            native_roots: true,
            extra_roots: Vec::new(),
            transport: TransportOptions::default(),
        }
    }
}

impl DialOptions {
    /// TLS with chain verification against platform roots
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect without TLS
    #[must_use]
    pub fn plain_text(mut self, enabled: bool) -> Self {
        self.plain_text = enabled;
        self
    }

    /// Probe with a bare connect bounded by `timeout` before dialing
    #[must_use]
    pub fn trial_connect_timeout(mut self, timeout: Duration) -> Self {
        self.trial_connect_timeout = Some(timeout);
        self
    }

    /// Bound the race when no trial timeout is set
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Skip chain verification
    #[must_use]
    pub fn skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    /// Pin the peer's SHA-1 fingerprint (colon-separated or bare hex)
    #[must_use]
    pub fn fingerprint(mut self, hex: impl Into<String>) -> Self {
        self.fingerprint = Some(hex.into());
        self
    }

    /// Require the peer certificate to be valid for `name`
    #[must_use]
    pub fn dns_name(mut self, name: impl Into<String>) -> Self {
        self.dns_name = Some(name.into());
        self
    }

    /// Enable or disable platform roots
    #[must_use]
    pub fn native_roots(mut self, enabled: bool) -> Self {
        self.native_roots = enabled;
        self
    }

    /// Trust an extra root
    #[must_use]
    pub fn add_root(mut self, root: CertificateDer<'static>) -> Self {
        self.extra_roots.push(root);
        self
    }

    /// Trust several extra roots
    #[must_use]
    pub fn add_roots(mut self, roots: impl IntoIterator<Item = CertificateDer<'static>>) -> Self {
        self.extra_roots.extend(roots);
        self
    }

    /// Override the SNI / verification name
    #[must_use]
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.transport.server_name = Some(name.into());
        self
    }

    /// Set `TCP_NODELAY`
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.transport.nodelay = enabled;
        self
    }

    /// The deadline the race runs under
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.trial_connect_timeout.unwrap_or(self.handshake_timeout)
    }

    /// The verification policy for TLS dials
    #[must_use]
    pub fn verification_options(&self) -> VerificationOptions {
        let mut options = VerificationOptions::new()
            .set_skip_chain_verify(self.skip_tls_verify)
            .native_roots(self.native_roots && !self.skip_tls_verify)
            .add_roots(self.extra_roots.iter().cloned());
        if let Some(fingerprint) = &self.fingerprint {
            options = options.fingerprint_sha1(fingerprint);
        }
        if let Some(name) = &self.dns_name {
            options = options.dns_name(name.clone());
        }
        options
    }
}
