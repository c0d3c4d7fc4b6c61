//! Error types for the Dune query service

use std::time::Duration;
use thiserror::Error;

/// Result type for Dune query service operations
pub type Result<T> = std::result::Result<T, DuneQueryError>;

/// Errors that can occur while resolving, executing or exporting a query
#[derive(Error, Debug)]
pub enum DuneQueryError {
    /// Unrecognized parameter kind handed to the factory
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Query with name {0} not found in configuration")]
    QueryNotFound(String),

    /// Transport-level failure talking to the Dune API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the Dune API
    #[error("Dune API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Execution {execution_id} finished in state {state}")]
    ExecutionFailed { execution_id: String, state: String },

    #[error("Query execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DuneQueryError {
    /// Create a new invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the failure came from the remote API (network, status, timeout, execution)
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api { .. } | Self::ExecutionFailed { .. } | Self::Timeout(_)
        )
    }

    /// Whether the failure happened while writing the export file
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Csv(_))
    }

    /// Whether the remote API rejected our credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}
