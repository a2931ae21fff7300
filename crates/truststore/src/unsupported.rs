//! Placeholder for platforms without a native trust store

use std::path::Path;

use crate::{Result, TrustStore, TrustStoreError};

#[derive(Debug, Clone)]
pub struct UnsupportedTrustStore {
    platform: &'static str,
}

impl UnsupportedTrustStore {
    pub fn new(platform: &'static str) -> Self {
        Self { platform }
    }

    fn unsupported(&self) -> TrustStoreError {
        TrustStoreError::Unsupported {
            platform: self.platform,
        }
    }
}

impl TrustStore for UnsupportedTrustStore {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn import(&self, _cert: &Path, _store: Option<&str>) -> Result<()> {
        Err(self.unsupported())
    }

    fn mark_trusted(&self, _cert: &Path, _store: Option<&str>) -> Result<()> {
        Err(self.unsupported())
    }
}
