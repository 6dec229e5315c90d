//! Error types for portsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Only pre-scan failures
//! are errors; per-port failures are [`ScanOutcome`](crate::scanner::ScanOutcome)
//! values and banner failures degrade to "no banner".

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors loading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("invalid setting {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Fatal, pre-scan failures. Any of these stops the run before a worker starts.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Could not resolve target: {0}")]
    Target(#[from] TargetError),

    #[error("Invalid port specification: {0}")]
    Ports(#[from] PortError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub type CliResult<T> = Result<T, CliError>;
