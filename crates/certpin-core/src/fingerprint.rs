//! SHA-1 certificate fingerprints via `ring::digest`.
//!
//! Fingerprints arrive in several spellings (`AB:CD:..`, `abcd..`,
//! `ABCD..`). All of them are compared in a single canonical form:
//! lower-case hex with no separators.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};

use crate::FingerprintError;

/// Marker printed by `openssl x509 -noout -fingerprint -sha1`.
pub const FINGERPRINT_FILE_PREFIX: &str = "SHA1 Fingerprint=";

/// Length of a SHA-1 digest in hex characters.
const SHA1_HEX_LEN: usize = 40;

/// Strip `:` separators and lower-case.
#[must_use]
pub fn normalize_hex(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// SHA-1 of raw certificate bytes (DER), lower-case hex.
#[must_use]
pub fn sha1_fingerprint(der: &[u8]) -> String {
    let digest = digest(&SHA1_FOR_LEGACY_USE_ONLY, der);
    hex::encode(digest.as_ref())
}

/// A validated SHA-1 fingerprint in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse colon-separated or bare hex, in any case.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::InvalidHex`] unless the input normalizes
    /// to exactly 40 hex digits.
    pub fn parse(input: &str) -> Result<Self, FingerprintError> {
        let canonical = normalize_hex(input.trim());
        if canonical.is_empty() {
            return Err(FingerprintError::Empty);
        }
        if canonical.len() != SHA1_HEX_LEN || !canonical.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FingerprintError::InvalidHex(input.to_string()));
        }
        Ok(Self(canonical))
    }

    /// Fingerprint of raw certificate bytes.
    #[must_use]
    pub fn of_der(der: &[u8]) -> Self {
        Self(sha1_fingerprint(der))
    }

    /// Canonical lower-case bare hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-case octets joined by `:`, as openssl prints them.
    #[must_use]
    pub fn colon_separated(&self) -> String {
        self.0
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Compare against any spelling of a fingerprint.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0 == normalize_hex(other)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Extract the digest from `SHA1 Fingerprint=<hex>` text.
///
/// # Errors
///
/// Returns an error if the marker is missing, nothing follows it, or the
/// digest is not valid hex.
pub fn parse_fingerprint_file(text: &str) -> Result<Fingerprint, FingerprintError> {
    let rest = text
        .trim_start()
        .strip_prefix(FINGERPRINT_FILE_PREFIX)
        .ok_or(FingerprintError::MissingPrefix {
            prefix: FINGERPRINT_FILE_PREFIX,
        })?;
    let digest = rest.trim();
    if digest.is_empty() {
        return Err(FingerprintError::Empty);
    }
    Fingerprint::parse(digest)
}

/// Read and parse a fingerprint file.
///
/// # Errors
///
/// Returns [`FingerprintError::Io`] if the file cannot be read, otherwise
/// the errors of [`parse_fingerprint_file`].
pub async fn load_fingerprint_file(path: &Path) -> Result<Fingerprint, FingerprintError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FingerprintError::Io {
            path: path.display().to_string(),
            source,
        })?;
    parse_fingerprint_file(&text)
}
