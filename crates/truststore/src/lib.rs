//! Operating system trust store registration
//!
//! Marks a certificate as trusted for TLS so that local clients accept the
//! self-signed certificate of the DAV server.
//!
//! Platform support:
//! - **macOS**: `security import` followed by `security add-trusted-cert -p ssl`
//! - everything else: [`UnsupportedTrustStore`], every operation fails with
//!   [`TrustStoreError::Unsupported`]

use std::path::Path;

mod keychain;
mod unsupported;

pub use keychain::KeychainTrustStore;
pub use unsupported::UnsupportedTrustStore;

#[derive(Debug, thiserror::Error)]
pub enum TrustStoreError {
    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no trust store is available on {platform}")]
    Unsupported { platform: &'static str },
}

pub type Result<T> = std::result::Result<T, TrustStoreError>;

/// Trust store abstraction
///
/// Implemented once per platform family. `store` names a specific store
/// (a keychain on macOS); `None` selects the platform default.
pub trait TrustStore {
    /// Short name of the backing facility
    fn name(&self) -> &'static str;

    /// Whether this platform has a trust store at all
    fn is_supported(&self) -> bool;

    /// Add the certificate to the store
    fn import(&self, cert: &Path, store: Option<&str>) -> Result<()>;

    /// Mark a previously imported certificate as trusted for TLS
    fn mark_trusted(&self, cert: &Path, store: Option<&str>) -> Result<()>;
}

/// Select the trust store of the running platform
pub fn native() -> Box<dyn TrustStore> {
    if cfg!(target_os = "macos") {
        Box::new(KeychainTrustStore::new())
    } else {
        Box::new(UnsupportedTrustStore::new(std::env::consts::OS))
    }
}
