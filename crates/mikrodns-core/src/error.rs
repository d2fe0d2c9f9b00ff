//! Error types for the webhook bridge.
//!
//! Per-request failures (validation, upstream errors, timeouts) are values,
//! not panics: every router operation returns a `Result` and the HTTP layer
//! maps the error kind to a status code. Only configuration and startup
//! connection failures are fatal, and those are handled by the daemon.

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the webhook bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Establishing the router session failed (TCP, TLS or login handshake)
    #[error("connection error: {0}")]
    Connection(String),

    /// The router rejected the supplied credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A request payload failed validation (client-caused)
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending payload field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A remote lookup/add/set/remove was refused or failed
    #[error("upstream {operation} failed: {message}")]
    Upstream {
        /// The record operation that was in flight
        operation: String,
        /// Error detail, usually the router's trap message
        message: String,
    },

    /// A remote call did not complete within the configured bound
    #[error("upstream {operation} timed out")]
    Timeout {
        /// The record operation that was in flight
        operation: String,
    },

    /// The router sent data the protocol layer could not make sense of
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Socket-level I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a validation error for a named payload field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an upstream operation error
    pub fn upstream(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error for a named operation
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
