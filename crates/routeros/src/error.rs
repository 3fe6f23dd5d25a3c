//! Error types for the RouterOS API client.
//!
//! This module defines all error types raised while talking to a router,
//! separating transport failures from errors the router itself reports.

use thiserror::Error;

/// The main error type for RouterOS API operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    /// Failed to open a TCP connection to the router.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// The `host:port` address that was dialed.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Socket read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation did not complete within the configured timeout.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: &'static str,
    },

    // === Protocol Errors ===
    /// The byte stream did not follow the API framing rules.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A word exceeded the length this client is willing to buffer.
    #[error("word of {length} bytes exceeds the {limit} byte limit")]
    WordTooLong {
        /// Declared length of the offending word.
        length: u32,
        /// Maximum length this client accepts.
        limit: u32,
    },

    // === Router-Reported Errors ===
    /// The router rejected a command with a `!trap` reply.
    #[error("command rejected by router: {message}")]
    Trap {
        /// Optional trap category reported by the router.
        category: Option<String>,
        /// Error message reported by the router.
        message: String,
    },

    /// The router terminated the connection with a `!fatal` reply.
    #[error("connection terminated by router: {0}")]
    Fatal(String),

    // === Login Errors ===
    /// The router refused the supplied credentials.
    #[error("login rejected: {message}")]
    LoginRejected {
        /// Error message reported by the router.
        message: String,
    },

    /// The router answered `/login` with a challenge, which means it runs a
    /// RouterOS release older than 6.43.
    #[error("router requires the pre-6.43 challenge login, which is not supported; upgrade RouterOS or connect to a 6.43+ device")]
    LegacyLogin,
}

/// A specialized Result type for RouterOS API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a new timeout error.
    #[must_use]
    pub fn timeout(operation: &'static str) -> Self {
        Self::Timeout { operation }
    }

    /// Check if this error is a `!trap` reported by the router.
    #[must_use]
    pub fn is_trap(&self) -> bool {
        matches!(self, Self::Trap { .. })
    }

    /// Check if this error is an authentication failure.
    #[must_use]
    pub fn is_login_rejected(&self) -> bool {
        matches!(self, Self::LoginRejected { .. })
    }

    /// Check if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
