use std::time::Duration;
use thiserror::Error;

/// Result type alias for peer verification
pub type VerifyResult<T> = std::result::Result<T, VerifyError>;

/// Result type alias for dial operations
pub type DialResult<T> = std::result::Result<T, DialError>;

/// Reasons a presented certificate chain was rejected.
///
/// Every variant is fatal for the handshake attempt. Nothing is retried
/// internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The peer sent an empty certificate list
    #[error("no certificates presented by peer")]
    NoCertificates,

    /// A raw certificate could not be decoded
    #[error("failed to parse certificate {index} from server: {reason}")]
    CertificateParse {
        /// Position in the presented chain (0 is the leaf)
        index: usize,
        /// Underlying decoder message
        reason: String,
    },

    /// The leaf or an intermediate is outside its validity window
    #[error("certificate expired: {reason}")]
    CertificateExpired {
        /// Which side of the window was violated
        reason: ValidityFailure,
    },

    /// Any other trust-path failure
    #[error("certificate chain verification failed: {0}")]
    ChainVerification(ChainFailure),

    /// The leaf digest does not match the pinned fingerprint
    #[error("not matched fingerprint: expected {expected}, got {actual}")]
    FingerprintMismatch {
        /// Pinned value, canonical form
        expected: String,
        /// Digest of the presented leaf, canonical form
        actual: String,
    },
}

/// Which side of a certificate's validity window was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityFailure {
    /// `notAfter` is in the past
    Expired,
    /// `notBefore` is in the future
    NotYetValid,
}

impl std::fmt::Display for ValidityFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => f.write_str("validity period has ended"),
            Self::NotYetValid => f.write_str("validity period has not started"),
        }
    }
}

/// Trust-path failures other than temporal validity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainFailure {
    /// No path to a trusted root
    #[error("certificate signed by unknown authority")]
    UnknownIssuer,

    /// The leaf is not valid for the expected DNS name
    #[error("certificate is not valid for name {0:?}")]
    NameMismatch(String),

    /// Anything else reported by the path builder
    #[error("{0}")]
    Other(String),
}

/// Fieldless discriminant of [`VerifyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyErrorKind {
    /// See [`VerifyError::NoCertificates`]
    NoCertificates,
    /// See [`VerifyError::CertificateParse`]
    CertificateParse,
    /// See [`VerifyError::CertificateExpired`]
    CertificateExpired,
    /// See [`VerifyError::ChainVerification`]
    ChainVerification,
    /// See [`VerifyError::FingerprintMismatch`]
    FingerprintMismatch,
}

impl VerifyError {
    /// Build a parse error for the certificate at `index`
    pub fn parse(index: usize, reason: impl Into<String>) -> Self {
        Self::CertificateParse {
            index,
            reason: reason.into(),
        }
    }

    /// Returns the error's kind
    #[must_use]
    pub const fn kind(&self) -> VerifyErrorKind {
        match self {
            Self::NoCertificates => VerifyErrorKind::NoCertificates,
            Self::CertificateParse { .. } => VerifyErrorKind::CertificateParse,
            Self::CertificateExpired { .. } => VerifyErrorKind::CertificateExpired,
            Self::ChainVerification(_) => VerifyErrorKind::ChainVerification,
            Self::FingerprintMismatch { .. } => VerifyErrorKind::FingerprintMismatch,
        }
    }

    /// Returns true if the certificate was rejected for temporal reasons
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::CertificateExpired { .. })
    }

    /// Returns true if the pinned fingerprint did not match
    #[must_use]
    pub const fn is_fingerprint_mismatch(&self) -> bool {
        matches!(self, Self::FingerprintMismatch { .. })
    }
}

/// Terminal errors of a dial attempt.
#[derive(Error, Debug)]
pub enum DialError {
    /// Nothing definitive happened before the deadline
    #[error("did not receive a response within {timeout:?} (maybe forgot to enable plain text?)")]
    NoResponse {
        /// The bound that elapsed
        timeout: Duration,
    },

    /// The peer certificate was rejected
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// Connect or handshake failed at the transport level
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The target address could not be interpreted
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The name used for SNI is not a valid DNS name or IP address
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// The client TLS configuration could not be built
    #[error("tls configuration error: {0}")]
    Tls(String),

    /// The caller's scope was cancelled before an outcome was reached
    #[error("dial cancelled")]
    Cancelled,

    /// Dial configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl DialError {
    /// Returns true if the dial hit its deadline
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::NoResponse { .. })
    }

    /// Returns true if the peer certificate was rejected
    #[must_use]
    pub const fn is_verification(&self) -> bool {
        matches!(self, Self::Verify(_))
    }

    /// Returns the verification failure, if that is what ended the dial
    #[must_use]
    pub const fn verify_error(&self) -> Option<&VerifyError> {
        match self {
            Self::Verify(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FingerprintError> for DialError {
    fn from(err: FingerprintError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Errors reading or parsing a pinned fingerprint.
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// The text did not start with the expected marker
    #[error("fingerprint must start with {prefix:?}")]
    MissingPrefix {
        /// The marker that was expected
        prefix: &'static str,
    },

    /// Nothing followed the marker
    #[error("empty fingerprint")]
    Empty,

    /// The digest is not 20 bytes of hex
    #[error("invalid SHA-1 fingerprint {0:?}")]
    InvalidHex(String),

    /// The fingerprint file could not be read
    #[error("failed to read fingerprint file {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
