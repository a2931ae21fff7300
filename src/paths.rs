//! Path helpers: default locations and home-relative display

use std::path::{Path, PathBuf};

/// Directory under the user configuration directory holding the server config
pub const SERVER_CONFIG_DIR: &str = "radicale";
/// Configuration file name inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config";
/// Certificate file name inside the configuration directory
pub const CERT_FILE_NAME: &str = "server.crt";
/// Private key file name inside the configuration directory
pub const KEY_FILE_NAME: &str = "server.key";

/// Default configuration directory, e.g. `~/.config/radicale`
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SERVER_CONFIG_DIR))
}

/// Renders paths for human-readable notices
///
/// Paths under the home directory are shown as `~/...`. The home directory is
/// injected so that display does not depend on the environment in tests.
#[derive(Debug, Clone, Default)]
pub struct PathPrettifier {
    home: Option<PathBuf>,
}

impl PathPrettifier {
    pub fn new(home: Option<PathBuf>) -> Self {
        Self { home }
    }

    /// Use the current user's home directory
    pub fn from_env() -> Self {
        Self::new(dirs::home_dir())
    }

    pub fn display(&self, path: &Path) -> String {
        match self.home.as_deref().and_then(|home| path.strip_prefix(home).ok()) {
            Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Some(rest) => Path::new("~").join(rest).display().to_string(),
            None => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_home_are_shortened() {
        let prettifier = PathPrettifier::new(Some(PathBuf::from("/home/dav")));
        assert_eq!(
            prettifier.display(Path::new("/home/dav/.config/radicale/config")),
            "~/.config/radicale/config"
        );
        assert_eq!(prettifier.display(Path::new("/home/dav")), "~");
    }

    #[test]
    fn test_paths_outside_home_are_unchanged() {
        let prettifier = PathPrettifier::new(Some(PathBuf::from("/home/dav")));
        assert_eq!(
            prettifier.display(Path::new("/home/davida/config")),
            "/home/davida/config"
        );
        assert_eq!(prettifier.display(Path::new("/etc/radicale")), "/etc/radicale");
    }

    #[test]
    fn test_without_home_nothing_is_shortened() {
        let prettifier = PathPrettifier::default();
        assert_eq!(prettifier.display(Path::new("/home/dav/x")), "/home/dav/x");
    }
}
