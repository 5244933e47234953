//! Peer certificate verification with fingerprint pinning.
//!
//! This crate provides [`PeerCertificateVerifier`], which decides whether a
//! presented chain is trusted given [`VerificationOptions`]:
//!
//! 1. every certificate must parse
//! 2. unless chain verification is skipped, the leaf must chain to a
//!    trusted root at the current time (and match the DNS name if one is
//!    configured); temporal validity is reported as
//!    [`VerifyError::CertificateExpired`] ahead of anything else
//! 3. if a SHA-1 fingerprint is pinned, the leaf must match it
//!
//! The verifier plugs into rustls as a `ServerCertVerifier` and reports its
//! verdict through lifecycle events and a [`SingleResultSignal`].
//!
//! # Example
//!
//! ```rust,ignore
//! use certpin_verify::{http_client, VerificationOptions};
//!
//! let client = http_client(
//!     VerificationOptions::new()
//!         .skip_chain_verify()
//!         .fingerprint_sha1("87:CB:7E:A9:55:BE:E6:D3:A8:B8:29:05:ED:6A:10:FE:D2:62:62:E8"),
//! )?;
//! let body = client.get("https://localhost:10110/?query=ok").send().await?.text().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/certpin-verify/0.3.0")]

mod error;
mod options;
mod roots;
mod tls;
mod verifier;

#[cfg(feature = "http")]
mod http;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{SetupError, SetupResult};
pub use options::VerificationOptions;
pub use roots::{load_pem_roots, parse_pem_roots, preload_native_roots, TrustStore};
pub use tls::{client_config, verify_error_from_io, verify_error_from_rustls};
pub use verifier::PeerCertificateVerifier;

#[cfg(feature = "http")]
pub use http::{http_client, http_client_builder};

pub use certpin_core::{
    event_channel, ChainFailure, EventReceiver, EventSender, Fingerprint, SingleResultSignal,
    ValidityFailure, VerificationEvent, VerifyError, VerifyErrorKind, VerifyResult,
};
pub use rustls::pki_types::CertificateDer;
