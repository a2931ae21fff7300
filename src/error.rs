//! Unified error model
//!
//! Top-level error type for davtls, aggregating the configuration and trust
//! store crates

use std::path::PathBuf;

use davtls_config::ConfigError;
use davtls_truststore::TrustStoreError;
use thiserror::Error;

/// davtls error enum
///
/// Every variant is fatal for the current run. None of them remove backups
/// that were already taken.
#[derive(Debug, Error)]
pub enum Error {
    // ========== Step errors ==========
    /// TLS is already enabled and `--force` was not given
    #[error("TLS is already enabled in {}; use --force to reconfigure", path.display())]
    AlreadyConfigured { path: PathBuf },

    /// The certificate generation tool failed
    #[error("Certificate generation failed: {message}")]
    Generation { message: String },

    /// Reading, parsing or writing the server configuration failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The trust store tool failed
    #[error("Trust store error: {0}")]
    Trust(TrustStoreError),

    /// The trust step was requested on a platform without a trust store
    #[error("Adding certificates to a trust store is not supported on {platform}")]
    UnsupportedPlatform { platform: &'static str },

    // ========== System errors ==========
    /// File access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No configuration directory given and none could be derived
    #[error("Could not determine the configuration directory; pass --config-dir")]
    MissingConfigDir,
}

impl From<TrustStoreError> for Error {
    fn from(err: TrustStoreError) -> Self {
        match err {
            TrustStoreError::Unsupported { platform } => Error::UnsupportedPlatform { platform },
            other => Error::Trust(other),
        }
    }
}

/// Result type used throughout davtls
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a certificate generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }
}
