//! Error types for the `ragchat-model` crate.

use thiserror::Error;

/// Errors that can occur while calling a language model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The HTTP request could not be sent or the connection failed.
    #[error("Request to {provider} failed: {message}")]
    Request {
        /// The model provider that was called.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} API returned {status}: {message}")]
    Api {
        /// The model provider that was called.
        provider: String,
        /// The HTTP status code.
        status: u16,
        /// The provider's error message, or the raw body.
        message: String,
    },

    /// The response could not be decoded.
    #[error("Failed to parse {provider} response: {message}")]
    InvalidResponse {
        /// The model provider that was called.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider returned no text.
    #[error("{provider} returned an empty response")]
    EmptyResponse {
        /// The model provider that was called.
        provider: String,
    },

    /// A client configuration error (missing key, bad URL).
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
