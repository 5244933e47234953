//! Dialing with pinned peer verification.
//!
//! [`DialOrchestrator`] connects to an address and produces exactly one
//! outcome: a [`Conn`] or a [`DialError`]. For TLS dials it installs a
//! [`PeerCertificateVerifier`](certpin_verify::PeerCertificateVerifier) as
//! the sole authority on the peer certificate and races the handshake
//! against the verifier's verdict and a deadline.
//!
//! # Example
//!
//! ```rust,ignore
//! use certpin_dial::{dial, CancellationToken, DialOptions};
//!
//! let options = DialOptions::new()
//!     .skip_tls_verify(true)
//!     .fingerprint("87:CB:7E:A9:55:BE:E6:D3:A8:B8:29:05:ED:6A:10:FE:D2:62:62:E8");
//! let conn = dial("localhost:10110", options, &CancellationToken::new()).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/certpin-dial/0.3.0")]

mod config;
mod conn;
mod dial;
mod options;
mod transport;

pub use config::{ConfigError, DialConfig};
pub use conn::Conn;
pub use dial::{dial, DialOrchestrator};
pub use options::{DialOptions, TransportOptions, DEFAULT_HANDSHAKE_TIMEOUT};
pub use transport::{TcpTransport, Transport};

pub use certpin_core::{CancellationToken, DialError, DialResult, VerifyError, VerifyErrorKind};
