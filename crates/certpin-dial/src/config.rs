//! File-based dial configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use certpin_core::{load_fingerprint_file, DialError, Fingerprint, FingerprintError};
use certpin_verify::{load_pem_roots, SetupError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::DialOptions;

/// Errors loading a [`DialConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The config is not valid TOML for [`DialConfig`]
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The pinned fingerprint is malformed or unreadable
    #[error("invalid fingerprint: {0}")]
    Fingerprint(#[from] FingerprintError),

    /// A root bundle could not be loaded
    #[error("invalid roots: {0}")]
    Roots(#[from] SetupError),
}

impl From<ConfigError> for DialError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Dial settings as written in a TOML file.
///
/// ```toml
/// skip_tls_verify = true
/// fingerprint_file = "/etc/certpin/server.sha1"
/// trial_connect_timeout_ms = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialConfig {
    /// Connect without TLS
    pub plain_text: bool,

    /// Trial connect timeout in milliseconds
    pub trial_connect_timeout_ms: Option<u64>,

    /// Race deadline in milliseconds when no trial timeout is set
    pub handshake_timeout_ms: Option<u64>,

    /// Skip chain verification
    pub skip_tls_verify: bool,

    /// Pinned SHA-1 fingerprint, colon-separated or bare hex
    pub fingerprint: Option<String>,

    /// File holding `SHA1 Fingerprint=<hex>`; used when `fingerprint` is unset
    pub fingerprint_file: Option<PathBuf>,

    /// Expected subject name of the peer
    pub dns_name: Option<String>,

    /// Trust platform roots (default: true)
    pub native_roots: Option<bool>,

    /// PEM bundles of extra trusted roots
    pub extra_roots_pem: Vec<PathBuf>,

    /// SNI / verification name override
    pub server_name: Option<String>,

    /// Set `TCP_NODELAY`
    pub nodelay: bool,
}

impl DialConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded dial config");
        Ok(config)
    }

    /// Resolve referenced files into [`DialOptions`].
    ///
    /// An inline `fingerprint` is validated and takes precedence over
    /// `fingerprint_file`.
    pub async fn into_options(self) -> Result<DialOptions, ConfigError> {
        let mut options = DialOptions::new()
            .plain_text(self.plain_text)
            .skip_tls_verify(self.skip_tls_verify)
            .native_roots(self.native_roots.unwrap_or(true))
            .nodelay(self.nodelay);

        if let Some(ms) = self.trial_connect_timeout_ms {
            options = options.trial_connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.handshake_timeout_ms {
            options = options.handshake_timeout(Duration::from_millis(ms));
        }

        let fingerprint = match (self.fingerprint, self.fingerprint_file) {
            (Some(inline), _) => Some(Fingerprint::parse(&inline)?),
            (None, Some(path)) => Some(load_fingerprint_file(&path).await?),
            (None, None) => None,
        };
        if let Some(fingerprint) = fingerprint {
            options = options.fingerprint(fingerprint.as_str());
        }

        if let Some(name) = self.dns_name {
            options = options.dns_name(name);
        }
        if let Some(name) = self.server_name {
            options = options.server_name(name);
        }
        for path in &self.extra_roots_pem {
            options = options.add_roots(load_pem_roots(path).await?);
        }

        Ok(options)
    }
}
