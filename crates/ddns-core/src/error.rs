//! Error types for the DDNS update orchestrator
//!
//! Every error that ends an attempt is also recorded as an `error` message on
//! the attempt's [`Status`](crate::status::Status) before it is returned.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// The resolution phase did not finish before the deadline
    #[error("{0}")]
    Timeout(String),

    /// A POST failed at the network layer (connect, TLS, proxy, HTTP status)
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a recognized non-success status code
    #[error("status code:{code} ({message})")]
    Protocol {
        /// Remote status code
        code: String,
        /// Remote message accompanying the code
        message: String,
    },

    /// The remote answered without a status code
    #[error("status code is empty")]
    EmptyStatusCode,

    /// The response body did not have the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Resolution succeeded but listed no candidate records
    #[error("no record found for {0}")]
    EmptyResult(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error for a non-success status code
    pub fn protocol(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an empty-result error for the given target
    pub fn empty_result(target: impl Into<String>) -> Self {
        Self::EmptyResult(target.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// True for network-layer failures, the only class a proxy switch can recover
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// True when the remote answered but not with success
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::EmptyStatusCode)
    }

    /// True when the resolution deadline expired
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
