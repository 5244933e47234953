//! Pinned HTTPS client.

use std::sync::Arc;

use tracing::debug;

use crate::error::SetupResult;
use crate::{client_config, PeerCertificateVerifier, VerificationOptions};

/// A reqwest builder whose TLS goes through a [`PeerCertificateVerifier`].
///
/// Further settings (timeouts, user agent, ...) can be applied before
/// `build()`.
///
/// # Errors
///
/// Returns an error if the TLS configuration cannot be built.
pub fn http_client_builder(options: VerificationOptions) -> SetupResult<reqwest::ClientBuilder> {
    debug!(
        skip_chain_verify = options.skip_chain_verify,
        pinned = options.fingerprint_sha1.is_some(),
        "building pinned http client"
    );
    let verifier = Arc::new(PeerCertificateVerifier::new(options));
    let config = client_config(verifier)?;
    Ok(reqwest::Client::builder().use_preconfigured_tls(config))
}

/// Build a reqwest client that enforces `options` on every TLS connection.
///
/// The verifier's signal records only the first handshake; each request
/// still gets its own verdict.
///
/// # Errors
///
/// Returns an error if the TLS configuration or the client cannot be built.
pub fn http_client(options: VerificationOptions) -> SetupResult<reqwest::Client> {
    Ok(http_client_builder(options)?.build()?)
}
