//! Enabling TLS in the server configuration

use davtls_config::ConfigDocument;
use tracing::info;

use crate::backup::BackupGuard;
use crate::error::{Error, Result};
use crate::paths::PathPrettifier;
use crate::request::ProvisioningRequest;

/// Configuration section holding the TLS settings
pub const SERVER_SECTION: &str = "server";
pub const SSL_KEY: &str = "ssl";
pub const CERTIFICATE_KEY: &str = "certificate";
pub const PRIVATE_KEY_KEY: &str = "key";

/// Whether the document has TLS switched on
///
/// A missing section, a missing key and an unrecognised value all count as off.
pub fn tls_enabled(doc: &ConfigDocument) -> bool {
    doc.get_bool(SERVER_SECTION, SSL_KEY).unwrap_or(false)
}

/// Points the server configuration at the certificate pair and enables TLS
pub struct TlsConfigurator<'a> {
    prettifier: &'a PathPrettifier,
}

impl<'a> TlsConfigurator<'a> {
    pub fn new(prettifier: &'a PathPrettifier) -> Self {
        Self { prettifier }
    }

    /// Rewrite the configuration so the server uses TLS
    ///
    /// Fails with [`Error::AlreadyConfigured`] when TLS is already on and the
    /// request is not forced. The file is backed up before it is replaced.
    /// Certificate and key paths must be valid UTF-8.
    pub fn configure(&self, request: &ProvisioningRequest) -> Result<()> {
        let mut doc = ConfigDocument::load_or_default(&request.config_path)?;

        if tls_enabled(&doc) && !request.force {
            return Err(Error::AlreadyConfigured {
                path: request.config_path.clone(),
            });
        }

        doc.set(SERVER_SECTION, SSL_KEY, "True");
        doc.set_path(SERVER_SECTION, CERTIFICATE_KEY, &request.cert_path)?;
        doc.set_path(SERVER_SECTION, PRIVATE_KEY_KEY, &request.key_path)?;

        BackupGuard::new(&request.backup_suffix, self.prettifier).backup(&request.config_path)?;
        doc.save(&request.config_path)?;

        info!(
            "🔧 Enabled TLS in {}",
            self.prettifier.display(&request.config_path)
        );
        Ok(())
    }
}
