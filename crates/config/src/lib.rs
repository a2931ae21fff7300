//! INI configuration document for the DAV server
//!
//! Reads, edits and atomically rewrites section/key-value configuration files
//! while keeping every line it did not change intact.

mod document;
pub mod error;

pub use document::{ConfigDocument, parse_bool};
pub use error::{ConfigError, Result};
