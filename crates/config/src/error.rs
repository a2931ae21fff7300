//! Configuration document errors
//!
//! Every failure reading, parsing or writing a configuration file

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading or persisting a [`ConfigDocument`](crate::ConfigDocument)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write configuration file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Path {} is not valid UTF-8 and cannot be stored in the configuration", path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("{}: {source}", path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Result type for configuration document operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            parse @ Self::Parse { .. } => Self::ParseFile {
                path: path.into(),
                source: Box::new(parse),
            },
            other => other,
        }
    }
}
