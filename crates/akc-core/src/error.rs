//! Error types for the key/value resource
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for resource operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the key/value resource
#[derive(Error, Debug)]
pub enum Error {
    /// The endpoint could not be parsed as a URL with a host
    #[error("Unable to parse the given endpoint {0}")]
    InvalidEndpoint(String),

    /// A persisted identifier could not be decoded
    #[error("Invalid resource identifier: {0}")]
    InvalidId(String),

    /// Invalid input (bad attribute values, malformed attribute maps)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A store client could not be built for an endpoint
    #[error("Unable to build a client for {endpoint}: {message}")]
    ClientConstruction {
        /// Endpoint the client was requested for
        endpoint: String,
        /// Error message
        message: String,
    },

    /// The entry already exists remotely and is not managed yet
    #[error("The resource needs to be imported: {resource_type} ({id})")]
    NeedsImport {
        /// Resource type name
        resource_type: &'static str,
        /// Identifier of the existing entry
        id: String,
    },

    /// Entry not found where one was required
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Config store errors
    #[error("Config store error: {0}")]
    Store(String),

    /// HTTP client errors (from the store API)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Store-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Store backend name
        provider: String,
        /// Error message
        message: String,
    },

    /// Operation exceeded its configured timeout
    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid endpoint error
    pub fn invalid_endpoint(endpoint: impl Into<String>) -> Self {
        Self::InvalidEndpoint(endpoint.into())
    }

    /// Create an invalid identifier error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a client construction error
    pub fn client_construction(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClientConstruction {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a config store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a store-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this is the pre-existing-entry error raised by create
    pub fn is_needs_import(&self) -> bool {
        matches!(self, Self::NeedsImport { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
