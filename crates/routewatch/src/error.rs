//! Error types for routewatch.
//!
//! This module defines all error types used throughout the routewatch crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for routewatch operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Router Errors ===
    /// Talking to the router failed.
    #[error("router API error: {0}")]
    Router(#[from] routewatch_routeros::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Ledger Errors ===
    /// The master CSV does not look like a routewatch ledger.
    #[error("ledger file {path} is corrupt: {message}; delete the file to start a fresh ledger")]
    LedgerCorrupt {
        /// Path to the offending file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    // === Report Errors ===
    /// Failed to write a report or alert file.
    #[error("failed to write report {path}: {source}")]
    ReportWrite {
        /// Path that could not be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for routewatch operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a ledger corruption error.
    #[must_use]
    pub fn ledger_corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::LedgerCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error reports a corrupt ledger file.
    #[must_use]
    pub fn is_ledger_corrupt(&self) -> bool {
        matches!(self, Self::LedgerCorrupt { .. })
    }

    /// Check if this error originated in the router client.
    #[must_use]
    pub fn is_router_error(&self) -> bool {
        matches!(self, Self::Router(_))
    }
}
