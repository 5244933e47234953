//! rustls integration.

use std::sync::Arc;

use certpin_core::VerifyError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, Error as TlsError, OtherError,
    SignatureScheme,
};

use crate::error::SetupResult;
use crate::PeerCertificateVerifier;

impl ServerCertVerifier for PeerCertificateVerifier {
    // The presented name is ignored; only `dns_name` in the options is checked.
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let mut chain = Vec::with_capacity(intermediates.len() + 1);
        chain.push(end_entity.clone());
        chain.extend(intermediates.iter().cloned());

        self.evaluate_at(&chain, now)
            .map(|()| ServerCertVerified::assertion())
            .map_err(|e| TlsError::InvalidCertificate(CertificateError::Other(OtherError(Arc::new(e)))))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

impl PeerCertificateVerifier {
    /// Erase into the trait object rustls expects
    #[must_use]
    pub fn into_rustls(self) -> Arc<dyn ServerCertVerifier> {
        Arc::new(self)
    }
}

/// Build a client configuration that routes certificate checks through
/// `verifier`.
///
/// # Errors
///
/// Returns [`SetupError::Tls`](crate::SetupError::Tls) if the ring provider
/// rejects the default protocol versions.
pub fn client_config(verifier: Arc<PeerCertificateVerifier>) -> SetupResult<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok(config)
}

/// Recover the verdict from a rustls error raised by a
/// [`PeerCertificateVerifier`].
#[must_use]
pub fn verify_error_from_rustls(err: &TlsError) -> Option<VerifyError> {
    match err {
        TlsError::InvalidCertificate(CertificateError::Other(other)) => {
            other.0.downcast_ref::<VerifyError>().cloned()
        }
        _ => None,
    }
}

/// Recover the verdict from an I/O error returned by a TLS stream
/// (tokio-rustls wraps handshake failures this way).
#[must_use]
pub fn verify_error_from_io(err: &std::io::Error) -> Option<VerifyError> {
    let inner = err.get_ref()?;
    if let Some(tls) = inner.downcast_ref::<TlsError>() {
        return verify_error_from_rustls(tls);
    }
    inner.downcast_ref::<VerifyError>().cloned()
}
