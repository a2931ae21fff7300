//! Command line interface definitions
//!
//! Flags for locating the configuration, certificate parameters and explicit
//! switches for each provisioning step
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::default_config_dir;
use crate::provision::Overrides;
use crate::request::{
    CertificateParams, DEFAULT_BACKUP_SUFFIX, DEFAULT_CIPHER, DEFAULT_KEY_SIZE,
    DEFAULT_VALIDITY_DAYS, ProvisioningRequest,
};

/// Program name used as prefix of error messages
pub const PROGRAM_NAME: &str = "davtls";

#[derive(Parser, Debug)]
#[command(name = PROGRAM_NAME)]
#[command(version)]
#[command(
    about = "Generate a self-signed TLS certificate for a local DAV server and enable TLS in its configuration",
    long_about = "Generate a self-signed TLS certificate for a local DAV server and enable TLS in its configuration.\n\n\
        Steps that are already done are skipped: an existing certificate/key pair is kept and a \
        configuration with TLS enabled is left alone, unless --force is given. Files are copied \
        to <path><suffix> before they are overwritten."
)]
pub struct Cli {
    /// Server configuration directory [default: <user config dir>/radicale]
    #[arg(short = 'd', long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Server configuration file [default: <config-dir>/config]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Certificate file [default: <config-dir>/server.crt]
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Private key file [default: <config-dir>/server.key]
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,

    /// Key algorithm of the generated certificate
    #[arg(long, default_value = DEFAULT_CIPHER)]
    pub cipher: String,

    /// Key size in bits
    #[arg(long, value_name = "BITS", default_value_t = DEFAULT_KEY_SIZE,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub key_size: u32,

    /// Certificate validity in days
    #[arg(long, value_name = "DAYS", default_value_t = DEFAULT_VALIDITY_DAYS,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// Suffix appended to files backed up before being overwritten
    #[arg(long, value_name = "SUFFIX", default_value = DEFAULT_BACKUP_SUFFIX)]
    pub backup_suffix: String,

    /// Redo steps that are already done
    #[arg(short, long)]
    pub force: bool,

    /// Print what is being done
    #[arg(short, long)]
    pub verbose: bool,

    /// Generate the certificate [default: when the certificate or key is missing]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true,
          default_missing_value = "true")]
    pub generate_cert: Option<bool>,

    /// Enable TLS in the configuration [default: when TLS is not enabled yet]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true,
          default_missing_value = "true")]
    pub enable_tls: Option<bool>,

    /// Trust the certificate in the system keychain (macOS only)
    /// [default: when a certificate is generated on macOS]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true,
          default_missing_value = "true")]
    pub trust: Option<bool>,

    /// Keychain to add the certificate to [default: the default keychain]
    #[arg(long, value_name = "NAME")]
    pub keychain: Option<String>,

    /// Certificate generation program
    #[arg(long, value_name = "PROGRAM", default_value = "openssl")]
    pub openssl: PathBuf,
}

impl Cli {
    /// Resolve defaults and explicit values into one request
    pub fn request(&self) -> Result<ProvisioningRequest> {
        let config_dir = match (&self.config_dir, &self.config, &self.cert, &self.key) {
            (Some(dir), ..) => dir.clone(),
            // Every file is given explicitly, no directory is needed.
            (None, Some(config), Some(_), Some(_)) => config
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            _ => default_config_dir().ok_or(Error::MissingConfigDir)?,
        };
        let defaults = ProvisioningRequest::with_defaults(&config_dir);

        Ok(ProvisioningRequest {
            config_path: self.config.clone().unwrap_or(defaults.config_path),
            cert_path: self.cert.clone().unwrap_or(defaults.cert_path),
            key_path: self.key.clone().unwrap_or(defaults.key_path),
            params: CertificateParams {
                cipher: self.cipher.clone(),
                key_size: self.key_size,
                validity_days: self.days,
            },
            backup_suffix: self.backup_suffix.clone(),
            force: self.force,
            verbose: self.verbose,
            keychain: self.keychain.clone(),
        })
    }

    /// Explicit step switches
    pub fn overrides(&self) -> Overrides {
        Overrides {
            generate_certificate: self.generate_cert,
            enable_tls: self.enable_tls,
            trust: self.trust,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once(PROGRAM_NAME).chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_from_config_dir() {
        let cli = parse(&["--config-dir", "/srv/dav"]);
        let request = cli.request().unwrap();
        assert_eq!(request, ProvisioningRequest::with_defaults(Path::new("/srv/dav")));
        assert_eq!(cli.overrides(), Overrides::default());
    }

    #[test]
    fn test_explicit_values_replace_defaults() {
        let cli = parse(&[
            "-d", "/srv/dav", "--cert", "/tls/dav.pem", "--cipher", "dsa", "--key-size", "2048",
            "--days", "30", "--backup-suffix", ".bak", "-f", "-v", "--keychain", "login",
        ]);
        let request = cli.request().unwrap();
        assert_eq!(request.config_path, PathBuf::from("/srv/dav/config"));
        assert_eq!(request.cert_path, PathBuf::from("/tls/dav.pem"));
        assert_eq!(request.key_path, PathBuf::from("/srv/dav/server.key"));
        assert_eq!(request.params.cipher, "dsa");
        assert_eq!(request.params.key_size, 2048);
        assert_eq!(request.params.validity_days, 30);
        assert_eq!(request.backup_suffix, ".bak");
        assert!(request.force);
        assert!(request.verbose);
        assert_eq!(request.keychain.as_deref(), Some("login"));
    }

    #[test]
    fn test_explicit_files_need_no_directory() {
        let cli = parse(&["-c", "/a/config", "--cert", "/b/c.crt", "--key", "/b/c.key"]);
        let request = cli.request().unwrap();
        assert_eq!(request.config_path, PathBuf::from("/a/config"));
        assert_eq!(request.key_path, PathBuf::from("/b/c.key"));
    }

    #[test]
    fn test_step_switches() {
        let cli = parse(&["--generate-cert", "--enable-tls=false", "--trust=true"]);
        assert_eq!(
            cli.overrides(),
            Overrides {
                generate_certificate: Some(true),
                enable_tls: Some(false),
                trust: Some(true),
            }
        );
    }

    #[test]
    fn test_rejects_zero_days() {
        let result = Cli::try_parse_from([PROGRAM_NAME, "--days", "0"]);
        assert!(result.is_err());
    }
}
