use thiserror::Error;

/// Result type alias for verifier and TLS setup
pub type SetupResult<T> = std::result::Result<T, SetupError>;

/// Errors building a verifier, a trust store or a TLS client.
///
/// These happen before any handshake; verdicts on a presented chain are
/// [`certpin_core::VerifyError`].
#[derive(Error, Debug)]
pub enum SetupError {
    /// rustls rejected the client configuration
    #[error("tls configuration error: {0}")]
    Tls(#[from] rustls::Error),

    /// A PEM bundle could not be decoded
    #[error("invalid PEM in {source_name}: {reason}")]
    Pem {
        /// File path or other label of the input
        source_name: String,
        /// Decoder message
        reason: String,
    },

    /// A root file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built
    #[cfg(feature = "http")]
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SetupError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
