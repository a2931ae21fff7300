//! Self-signed certificate provisioning

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::backup::BackupGuard;
use crate::error::{Error, Result};
use crate::paths::PathPrettifier;
use crate::request::{CERTIFICATE_SUBJECT, CertificateParams, ProvisioningRequest};

/// What to generate and where to put it
#[derive(Debug, Clone, Copy)]
pub struct CertificateSpec<'a> {
    pub subject: &'a str,
    pub params: &'a CertificateParams,
    pub cert_path: &'a Path,
    pub key_path: &'a Path,
}

/// Capability that writes a self-signed certificate and its private key
pub trait CertificateGenerator {
    fn generate(&self, spec: &CertificateSpec<'_>) -> Result<()>;
}

/// Generates certificates with the `openssl req` command
#[derive(Debug, Clone)]
pub struct OpensslGenerator {
    program: PathBuf,
}

impl Default for OpensslGenerator {
    fn default() -> Self {
        Self::new("openssl")
    }
}

impl OpensslGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, spec: &CertificateSpec<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["req", "-x509", "-nodes", "-newkey"])
            .arg(format!("{}:{}", spec.params.cipher, spec.params.key_size))
            .arg("-days")
            .arg(spec.params.validity_days.to_string())
            .arg("-subj")
            .arg(spec.subject)
            .arg("-keyout")
            .arg(spec.key_path)
            .arg("-out")
            .arg(spec.cert_path);
        cmd
    }
}

impl CertificateGenerator for OpensslGenerator {
    fn generate(&self, spec: &CertificateSpec<'_>) -> Result<()> {
        let mut cmd = self.command(spec);
        debug!(?cmd, "running certificate generator");

        let output = cmd.output().map_err(|e| {
            Error::generation(format!("failed to run {}: {e}", self.program.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::generation(format!(
                "{} exited with status {}: {}",
                self.program.display(),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Backs up the current pair and generates a new one
pub struct CertificateProvisioner<'a> {
    generator: &'a dyn CertificateGenerator,
    prettifier: &'a PathPrettifier,
}

impl<'a> CertificateProvisioner<'a> {
    pub fn new(generator: &'a dyn CertificateGenerator, prettifier: &'a PathPrettifier) -> Self {
        Self {
            generator,
            prettifier,
        }
    }

    /// Regenerate the certificate and key unconditionally
    ///
    /// Existing files are backed up first. On failure the backups stay where
    /// they are. A generator that reports success without leaving both files
    /// behind is treated as a failure.
    pub fn provision(&self, request: &ProvisioningRequest) -> Result<()> {
        let guard = BackupGuard::new(&request.backup_suffix, self.prettifier);
        guard.backup(&request.cert_path)?;
        guard.backup(&request.key_path)?;

        for path in [&request.cert_path, &request.key_path] {
            ensure_parent_dir(path)?;
        }

        self.generator.generate(&CertificateSpec {
            subject: CERTIFICATE_SUBJECT,
            params: &request.params,
            cert_path: &request.cert_path,
            key_path: &request.key_path,
        })?;

        for path in [&request.cert_path, &request.key_path] {
            if !path.is_file() {
                return Err(Error::generation(format!(
                    "generator reported success but {} was not written",
                    path.display()
                )));
            }
        }

        restrict_key_permissions(&request.key_path)?;

        info!(
            "🔐 Generated certificate {} and key {}",
            self.prettifier.display(&request.cert_path),
            self.prettifier.display(&request.key_path)
        );
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))
        }
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn restrict_key_permissions(key_path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(key_path, fs::Permissions::from_mode(0o600))
        .map_err(|e| Error::io(key_path, e))
}

#[cfg(not(unix))]
fn restrict_key_permissions(_key_path: &Path) -> Result<()> {
    Ok(())
}
