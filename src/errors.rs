/*!
 * Error types for the novelwai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Most pipeline failures are recovered locally (a failed stage passes its
 * input through), so only `PipelineError::InvalidInput` is expected to reach
 * a user in normal operation.
 */

use thiserror::Error;

/// Errors that can occur when working with text-generation provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered, but with nothing usable
    #[error("Empty response from provider")]
    EmptyResponse,
}

/// Errors that can occur when talking to the entity store
#[derive(Error, Debug)]
pub enum EntityStoreError {
    /// The store could not be reached or rejected the request
    #[error("Entity store request failed: {0}")]
    RequestFailed(String),

    /// The store answered with a payload we could not understand
    #[error("Failed to parse entity store response: {0}")]
    ParseError(String),

    /// Local file access failed
    #[error("Entity store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No store is configured
    #[error("Entity store unavailable")]
    Unavailable,
}

/// Errors that abort a chapter translation
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required identifying parameter is missing or malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the entity store
    #[error("Entity store error: {0}")]
    EntityStore(#[from] EntityStoreError),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
