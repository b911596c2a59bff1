//! Error types for portprobe.
//!
//! Uses `thiserror` for ergonomic error definitions. Only
//! [`ScanError::InvalidArgument`] and [`ScanError::ResolutionFailure`] abort a
//! scan before it starts; per-port failures are recorded in the report as
//! [`ProbeState::Error`](crate::scanner::ProbeState::Error) instead.

use crate::scanner::PartialReport;
use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bad target, port specification or scan option. Raised before any
    /// network activity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The target hostname could not be resolved. Fatal to the whole scan.
    #[error("failed to resolve '{host}': {reason}")]
    ResolutionFailure { host: String, reason: String },

    /// The caller cancelled the scan. Carries whatever had completed.
    #[error("scan cancelled after {} of {} ports", .0.completed_count(), .0.requested)]
    Cancelled(Box<PartialReport>),
}

impl ScanError {
    /// The partial report, if this is a cancellation.
    pub fn partial_report(&self) -> Option<&PartialReport> {
        match self {
            Self::Cancelled(partial) => Some(partial),
            _ => None,
        }
    }
}

impl From<PortError> for ScanError {
    fn from(e: PortError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<TargetError> for ScanError {
    fn from(e: TargetError) -> Self {
        match e {
            TargetError::DnsResolutionFailed(host, reason) => {
                Self::ResolutionFailure { host, reason }
            }
            TargetError::NoAddressesFound(host) => Self::ResolutionFailure {
                host,
                reason: "no addresses found".to_string(),
            },
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid configuration in {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output error: {0}")]
    Csv(#[from] csv::Error),

    #[error("output error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Invalid invocations exit with 2 (matching clap's own usage errors),
    /// interrupted scans with 130, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Scan(ScanError::InvalidArgument(_))
            | Self::Config(ConfigError::UnknownProfile(_)) => 2,
            Self::Scan(ScanError::Cancelled(_)) => 130,
            _ => 1,
        }
    }
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
