//! Error types for gort.
//!
//! Uses `thiserror` for ergonomic error definitions. Configuration problems
//! are collected as [`RequestError`]s by the builder and surfaced together
//! as [`ScanError::InvalidRequest`]; everything else is a runtime failure
//! that aborts the scan.

use crate::types::PortError;
use std::path::PathBuf;
use thiserror::Error;

/// A problem with the scan configuration, detected before any I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("target cannot be empty")]
    EmptyTarget,

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error(transparent)]
    Port(#[from] PortError),
}

/// Main error type for scanning operations.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid scan request: {}", join_errors(.0))]
    InvalidRequest(Vec<RequestError>),

    #[error("failed to resolve target '{host}': {reason}")]
    Resolution { host: String, reason: String },

    #[error("no usable address found for '{0}'")]
    NoAddress(String),

    #[error("unsupported target: {0}")]
    UnsupportedTarget(String),

    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("raw socket error: {0}")]
    RawSocket(String),

    #[error("invalid packet: {0}")]
    InvalidPacket(String),
}

impl ScanError {
    /// True when the scan was rejected at build time.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

fn join_errors(errors: &[RequestError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from loading engine settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
