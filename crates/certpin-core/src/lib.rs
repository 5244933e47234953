//! Core types for pinned TLS peer verification.
//!
//! This crate provides the pieces shared by the verifier and the dial
//! orchestrator:
//!
//! - **Errors**: the verification taxonomy ([`VerifyError`]) and the dial
//!   outcome errors ([`DialError`])
//! - **Events**: [`VerificationEvent`] and a non-blocking [`EventSender`]
//! - **Signal**: [`SingleResultSignal`], a first-write-wins result cell
//!   that any number of tasks can await
//! - **Fingerprints**: SHA-1 digests and their canonical hex form
//!
//! # Example
//!
//! ```rust,ignore
//! use certpin_core::{normalize_hex, Fingerprint};
//!
//! assert_eq!(normalize_hex("AB:CD:EF"), "abcdef");
//! let pin = Fingerprint::parse("7E:12:49:9C:EC:EC:22:DE:53:78:71:79:BF:28:D4:51:2D:66:23:96")?;
//! println!("{pin}");
//! ```

#![doc(html_root_url = "https://docs.rs/certpin-core/0.3.0")]

mod error;
pub mod event;
pub mod fingerprint;
pub mod signal;

pub use error::{
    ChainFailure, DialError, DialResult, FingerprintError, ValidityFailure, VerifyError,
    VerifyErrorKind, VerifyResult,
};
pub use event::{event_channel, EventReceiver, EventSender, VerificationEvent};
pub use fingerprint::{
    load_fingerprint_file, normalize_hex, parse_fingerprint_file, sha1_fingerprint, Fingerprint,
};
pub use signal::SingleResultSignal;

/// Re-exported so callers can build cancellation scopes without a direct dependency.
pub use tokio_util::sync::CancellationToken;
