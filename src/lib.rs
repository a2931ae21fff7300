//! davtls: TLS provisioning for a local DAV server
//!
//! Generates a self-signed certificate/key pair, enables TLS in the server
//! configuration and, where the platform has one, trusts the certificate in
//! the system trust store. Every file is backed up before it is overwritten.

pub mod backup;
pub mod certificate;
pub mod cli;
pub mod error;
pub mod observability;
pub mod paths;
pub mod provision;
pub mod request;
pub mod tls;
pub mod trust;

pub use error::{Error, Result};
