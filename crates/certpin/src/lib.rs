//! TLS peer verification with SHA-1 fingerprint pinning.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use certpin::{dial, CancellationToken, DialOptions};
//!
//! #[tokio::main]
//! async fn main() -> certpin::DialResult<()> {
//!     // Trust a self-signed server by its fingerprint alone
//!     let options = DialOptions::new()
//!         .skip_tls_verify(true)
//!         .fingerprint("87:CB:7E:A9:55:BE:E6:D3:A8:B8:29:05:ED:6A:10:FE:D2:62:62:E8");
//!
//!     let conn = dial("localhost:10110", options, &CancellationToken::new()).await?;
//!     println!("peer presented {:?} certificates", conn.peer_certificates().map(<[_]>::len));
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - `http` and `dial`
//! - `http` - Pinned HTTPS client built on reqwest
//! - `dial` - Race-based dialer with plain-text and TLS connections

#![doc(html_root_url = "https://docs.rs/certpin/0.3.0")]

// Re-export core types
pub use certpin_core::*;

// Re-export verification
pub use certpin_verify::{
    client_config, load_pem_roots, parse_pem_roots, preload_native_roots, verify_error_from_io,
    verify_error_from_rustls, CertificateDer, PeerCertificateVerifier, SetupError, SetupResult,
    TrustStore, VerificationOptions,
};

#[cfg(feature = "http")]
pub use certpin_verify::{http_client, http_client_builder};

// Re-export dialer if enabled
#[cfg(feature = "dial")]
pub use certpin_dial::{
    dial, ConfigError, Conn, DialConfig, DialOptions, DialOrchestrator, TcpTransport,
    Transport, TransportOptions, DEFAULT_HANDSHAKE_TIMEOUT,
};

// Re-export runtime for convenience
pub use tokio;
