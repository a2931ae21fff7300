//! macOS keychain integration via the `security` tool

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::{Result, TrustStore, TrustStoreError};

/// Trust store backed by the macOS `security` command line tool
#[derive(Debug, Clone)]
pub struct KeychainTrustStore {
    program: PathBuf,
}

impl Default for KeychainTrustStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeychainTrustStore {
    pub fn new() -> Self {
        Self::with_program("security")
    }

    /// Use a different `security` executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, subcommand: &str, args: Vec<OsString>) -> Result<()> {
        let command = format!("{} {}", self.program.display(), subcommand);
        debug!(command = %command, ?args, "running trust store command");

        let output = Command::new(&self.program)
            .arg(subcommand)
            .args(&args)
            .output()
            .map_err(|source| TrustStoreError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(command = %command, stderr = %stderr, "trust store command failed");
        Err(TrustStoreError::CommandFailed {
            command,
            status: output.status.code().unwrap_or(-1),
            stderr,
        })
    }
}

fn keychain_args(store: Option<&str>) -> Vec<OsString> {
    match store {
        Some(keychain) => vec!["-k".into(), keychain.into()],
        None => Vec::new(),
    }
}

impl TrustStore for KeychainTrustStore {
    fn name(&self) -> &'static str {
        "macOS keychain"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn import(&self, cert: &Path, store: Option<&str>) -> Result<()> {
        let mut args = vec![cert.as_os_str().to_os_string()];
        args.extend(keychain_args(store));
        self.run("import", args)
    }

    fn mark_trusted(&self, cert: &Path, store: Option<&str>) -> Result<()> {
        let mut args: Vec<OsString> = vec!["-p".into(), "ssl".into()];
        args.extend(keychain_args(store));
        args.push(cert.as_os_str().to_os_string());
        self.run("add-trusted-cert", args)
    }
}
