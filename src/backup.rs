//! Backups of files about to be overwritten

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::paths::PathPrettifier;

/// Backup location of `original`: the same path with `suffix` appended
pub fn backup_path(original: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(original.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// Copies a file aside before it is mutated
///
/// Only the latest copy is kept: a second backup of the same file overwrites
/// the first.
#[derive(Debug, Clone)]
pub struct BackupGuard<'a> {
    suffix: &'a str,
    prettifier: &'a PathPrettifier,
}

impl<'a> BackupGuard<'a> {
    pub fn new(suffix: &'a str, prettifier: &'a PathPrettifier) -> Self {
        Self { suffix, prettifier }
    }

    /// Back up `original` if it exists
    ///
    /// Returns whether a backup was written.
    pub fn backup(&self, original: &Path) -> Result<bool> {
        if !original.exists() {
            return Ok(false);
        }

        let target = backup_path(original, self.suffix);
        fs::copy(original, &target).map_err(|e| Error::io(&target, e))?;

        info!(
            "💾 Backed up {} to {}",
            self.prettifier.display(original),
            self.prettifier.display(&target)
        );
        Ok(true)
    }
}
