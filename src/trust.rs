//! Registering the certificate with the OS trust store

use std::path::Path;

use davtls_truststore::TrustStore;
use tracing::info;

use crate::error::Result;
use crate::paths::PathPrettifier;

/// Name shown when no keychain was given
pub const DEFAULT_KEYCHAIN_LABEL: &str = "default keychain";

/// Marks certificates as trusted through a platform [`TrustStore`]
pub struct TrustRegistrar<'a> {
    store: Box<dyn TrustStore>,
    prettifier: &'a PathPrettifier,
}

impl<'a> TrustRegistrar<'a> {
    pub fn new(store: Box<dyn TrustStore>, prettifier: &'a PathPrettifier) -> Self {
        Self { store, prettifier }
    }

    /// Whether the platform has a trust store to register with
    pub fn is_supported(&self) -> bool {
        self.store.is_supported()
    }

    /// Import `cert_path` and trust it for TLS
    ///
    /// `keychain` selects a store by name; `None` uses the platform default.
    pub fn trust(&self, cert_path: &Path, keychain: Option<&str>) -> Result<()> {
        self.store.import(cert_path, keychain)?;
        self.store.mark_trusted(cert_path, keychain)?;

        info!(
            "🛡️  Trusted {} in {} ({})",
            self.prettifier.display(cert_path),
            keychain.unwrap_or(DEFAULT_KEYCHAIN_LABEL),
            self.store.name()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use davtls_truststore::{TrustStoreError, UnsupportedTrustStore};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<String>>>;

    struct FakeStore {
        calls: Calls,
        fail_import: bool,
    }

    impl TrustStore for FakeStore {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn is_supported(&self) -> bool {
            true
        }

        fn import(&self, cert: &Path, store: Option<&str>) -> davtls_truststore::Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("import {} {:?}", cert.display(), store));
            if self.fail_import {
                return Err(TrustStoreError::CommandFailed {
                    command: "fake import".to_string(),
                    status: 1,
                    stderr: "denied".to_string(),
                });
            }
            Ok(())
        }

        fn mark_trusted(&self, cert: &Path, store: Option<&str>) -> davtls_truststore::Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("trust {} {:?}", cert.display(), store));
            Ok(())
        }
    }

    fn registrar(fail_import: bool, prettifier: &PathPrettifier) -> (TrustRegistrar<'_>, Calls) {
        let calls = Calls::default();
        let store = FakeStore {
            calls: calls.clone(),
            fail_import,
        };
        (TrustRegistrar::new(Box::new(store), prettifier), calls)
    }

    #[test]
    fn test_import_then_trust() {
        let prettifier = PathPrettifier::default();
        let (registrar, calls) = registrar(false, &prettifier);

        registrar
            .trust(Path::new("/d/server.crt"), Some("login.keychain"))
            .unwrap();

        assert_eq!(
            calls.borrow().as_slice(),
            [
                "import /d/server.crt Some(\"login.keychain\")",
                "trust /d/server.crt Some(\"login.keychain\")",
            ]
        );
    }

    #[test]
    fn test_failed_import_stops_before_trusting() {
        let prettifier = PathPrettifier::default();
        let (registrar, calls) = registrar(true, &prettifier);

        let err = registrar.trust(Path::new("/d/server.crt"), None).unwrap_err();

        assert!(matches!(err, Error::Trust(_)));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_unsupported_platform() {
        let prettifier = PathPrettifier::default();
        let registrar =
            TrustRegistrar::new(Box::new(UnsupportedTrustStore::new("linux")), &prettifier);

        assert!(!registrar.is_supported());
        let err = registrar.trust(Path::new("/d/server.crt"), None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform { platform: "linux" }));
    }
}
