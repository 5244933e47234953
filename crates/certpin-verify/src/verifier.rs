//! The peer certificate decision.

use certpin_core::{
    sha1_fingerprint, CancellationToken, ChainFailure, EventSender, SingleResultSignal,
    ValidityFailure, VerificationEvent, VerifyError, VerifyResult,
};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tracing::{debug, warn};
use x509_parser::certificate::X509Certificate;

use crate::{TrustStore, VerificationOptions};

/// Decides whether a presented chain is trusted.
///
/// One verifier serves one handshake attempt: its signal keeps the first
/// verdict, and its events describe that attempt. Calling
/// [`evaluate`](Self::evaluate) again still returns a fresh verdict but no
/// longer changes the signal.
#[derive(Debug)]
pub struct PeerCertificateVerifier {
    options: VerificationOptions,
    trust: TrustStore,
    pub(crate) algorithms: WebPkiSupportedAlgorithms,
    signal: SingleResultSignal<VerifyError>,
    events: Option<EventSender>,
}

impl PeerCertificateVerifier {
    /// Create a verifier whose signal has no linked scope
    #[must_use]
    pub fn new(options: VerificationOptions) -> Self {
        Self::with_signal(options, SingleResultSignal::new())
    }

    /// Create a verifier whose signal cancels a child of `parent` on resolution.
    ///
    /// Returns the verifier and the child scope.
    #[must_use]
    pub fn with_cancellation(
        options: VerificationOptions,
        parent: &CancellationToken,
    ) -> (Self, CancellationToken) {
        let (signal, scope) = SingleResultSignal::with_cancellation(parent);
        (Self::with_signal(options, signal), scope)
    }

    fn with_signal(options: VerificationOptions, signal: SingleResultSignal<VerifyError>) -> Self {
        let trust = if options.skip_chain_verify {
            TrustStore::from_options(&options.clone().native_roots(false))
        } else {
            TrustStore::from_options(&options)
        };

        Self {
            options,
            trust,
            algorithms: rustls::crypto::ring::default_provider().signature_verification_algorithms,
            signal,
            events: None,
        }
    }

    /// Report lifecycle events on `events`
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// The options this verifier enforces
    #[must_use]
    pub const fn options(&self) -> &VerificationOptions {
        &self.options
    }

    /// A handle to the verdict signal
    #[must_use]
    pub fn signal(&self) -> SingleResultSignal<VerifyError> {
        self.signal.clone()
    }

    /// Wait for the first verdict
    pub async fn wait(&self) -> VerifyResult<()> {
        self.signal.wait().await
    }

    /// The first verdict, if one was reached
    #[must_use]
    pub fn verdict(&self) -> Option<VerifyResult<()>> {
        self.signal.peek()
    }

    /// Evaluate a chain (leaf first, then intermediates) at the current time.
    ///
    /// # Errors
    ///
    /// Returns the reason the chain was rejected.
    pub fn evaluate(&self, certs: &[CertificateDer<'_>]) -> VerifyResult<()> {
        self.evaluate_at(certs, UnixTime::now())
    }

    /// Evaluate a chain at `now`.
    ///
    /// Emits `Begin`, then `Done` or `Error`, and resolves the signal with
    /// the verdict before returning it.
    ///
    /// # Errors
    ///
    /// Returns the reason the chain was rejected.
    pub fn evaluate_at(&self, certs: &[CertificateDer<'_>], now: UnixTime) -> VerifyResult<()> {
        self.emit(VerificationEvent::Begin);
        debug!(
            certs = certs.len(),
            skip_chain_verify = self.options.skip_chain_verify,
            pinned = self.options.fingerprint_sha1.is_some(),
            "verifying peer certificate"
        );

        let verdict = self.check(certs, now);
        match &verdict {
            Ok(()) => {
                debug!("peer certificate accepted");
                self.emit(VerificationEvent::Done);
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "peer certificate rejected");
                self.emit(VerificationEvent::Error(err.clone()));
            }
        }
        self.signal.resolve(verdict.clone());
        verdict
    }

    fn emit(&self, event: VerificationEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    fn check(&self, certs: &[CertificateDer<'_>], now: UnixTime) -> VerifyResult<()> {
        let Some((leaf, intermediates)) = certs.split_first() else {
            return Err(VerifyError::NoCertificates);
        };

        for (index, der) in certs.iter().enumerate() {
            let (_, cert) = x509_parser::parse_x509_certificate(der)
                .map_err(|e| VerifyError::parse(index, e.to_string()))?;
            if index == 0 {
                log_leaf(&cert);
            }
        }

        if !self.options.skip_chain_verify {
            self.verify_chain(leaf, intermediates, now)?;
        }

        if let Some(expected) = &self.options.fingerprint_sha1 {
            let actual = sha1_fingerprint(leaf);
            if *expected != actual {
                return Err(VerifyError::FingerprintMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok(())
    }

    fn verify_chain(
        &self,
        leaf: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> VerifyResult<()> {
        let end_entity =
            webpki::EndEntityCert::try_from(leaf).map_err(|e| VerifyError::parse(0, format!("{e:?}")))?;

        end_entity
            .verify_for_usage(
                self.algorithms.all,
                self.trust.anchors(),
                intermediates,
                now,
                webpki::KeyUsage::server_auth(),
                None,
                None,
            )
            .map_err(|e| chain_error(&e, None))?;

        if let Some(name) = &self.options.dns_name {
            let server_name = ServerName::try_from(name.as_str()).map_err(|_| {
                VerifyError::ChainVerification(ChainFailure::NameMismatch(name.clone()))
            })?;
            end_entity
                .verify_is_valid_for_subject_name(&server_name)
                .map_err(|e| chain_error(&e, Some(name.as_str())))?;
        }

        Ok(())
    }
}

/// Validity lapses take priority over every other path failure.
fn chain_error(err: &webpki::Error, name: Option<&str>) -> VerifyError {
    match err {
        webpki::Error::CertExpired { .. } => VerifyError::CertificateExpired {
            reason: ValidityFailure::Expired,
        },
        webpki::Error::CertNotValidYet { .. } => VerifyError::CertificateExpired {
            reason: ValidityFailure::NotYetValid,
        },
        webpki::Error::UnknownIssuer => VerifyError::ChainVerification(ChainFailure::UnknownIssuer),
        webpki::Error::CertNotValidForName { .. } => VerifyError::ChainVerification(
            ChainFailure::NameMismatch(name.unwrap_or_default().to_string()),
        ),
        other => VerifyError::ChainVerification(ChainFailure::Other(format!("{other:?}"))),
    }
}

fn log_leaf(cert: &X509Certificate<'_>) {
    let (not_before, not_after) = validity_window(cert);
    debug!(
        subject = %cert.subject(),
        issuer = %cert.issuer(),
        %not_before,
        %not_after,
        "peer leaf certificate"
    );
}

fn validity_window(cert: &X509Certificate<'_>) -> (String, String) {
    let validity = cert.validity();
    (
        validity.not_before.to_string(),
        validity.not_after.to_string(),
    )
}
