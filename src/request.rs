//! Provisioning request: the resolved options of one run

use std::path::{Path, PathBuf};

use crate::paths::{CERT_FILE_NAME, CONFIG_FILE_NAME, KEY_FILE_NAME};

/// Default key algorithm passed to the certificate generator
pub const DEFAULT_CIPHER: &str = "rsa";
/// Default key size in bits
pub const DEFAULT_KEY_SIZE: u32 = 4096;
/// Default certificate validity in days
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;
/// Default suffix appended to files before they are overwritten
pub const DEFAULT_BACKUP_SUFFIX: &str = ".orig";
/// Subject of every generated certificate
pub const CERTIFICATE_SUBJECT: &str = "/CN=localhost";

/// Cryptographic parameters of the generated certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateParams {
    /// Key algorithm name, e.g. `rsa`
    pub cipher: String,
    /// Key size in bits
    pub key_size: u32,
    /// Validity period in days
    pub validity_days: u32,
}

impl Default for CertificateParams {
    fn default() -> Self {
        Self {
            cipher: DEFAULT_CIPHER.to_string(),
            key_size: DEFAULT_KEY_SIZE,
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}

/// Everything a run needs, resolved once at startup
///
/// Built from defaults and explicit command line values, then shared by
/// reference with every step. Nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    /// Server configuration file
    pub config_path: PathBuf,
    /// Certificate output path
    pub cert_path: PathBuf,
    /// Private key output path
    pub key_path: PathBuf,
    pub params: CertificateParams,
    /// Suffix for backups of overwritten files
    pub backup_suffix: String,
    /// Redo steps that are already satisfied
    pub force: bool,
    pub verbose: bool,
    /// Keychain for the trust step; `None` uses the default
    pub keychain: Option<String>,
}

impl ProvisioningRequest {
    /// Defaults for a configuration directory
    ///
    /// The configuration, certificate and key files all live directly inside
    /// `config_dir`.
    pub fn with_defaults(config_dir: &Path) -> Self {
        Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            cert_path: config_dir.join(CERT_FILE_NAME),
            key_path: config_dir.join(KEY_FILE_NAME),
            params: CertificateParams::default(),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            force: false,
            verbose: false,
            keychain: None,
        }
    }
}
