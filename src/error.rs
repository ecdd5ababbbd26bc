//! Error types
//!
//! Only configuration and startup failures surface to callers. Per-subscriber
//! transport errors are contained inside the send-loop and never show up here.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the broadcaster
#[derive(Debug, Error)]
pub enum Error {
    /// Endpoint string is not of the form `scheme://host:port`
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The endpoint as given
        endpoint: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Endpoint scheme is not supported by any transport
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// Binding or I/O thread setup failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The I/O thread exited before reporting its listener address
    #[error("broadcast server stopped")]
    ServerStopped,
}

impl Error {
    /// Whether this error comes from a malformed configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::InvalidEndpoint { .. } | Error::UnsupportedScheme(_)
        )
    }
}
