//! Error types for completion providers.

use thiserror::Error;

/// Errors that can occur when requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider has no credentials
    #[error("Completion provider not configured: {0}")]
    NotConfigured(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Response body or structured output could not be parsed
    #[error("Failed to parse completion: {0}")]
    Parse(String),

    /// Invalid settings object
    #[error("Invalid completion settings: {0}")]
    Settings(String),
}

/// Result type for completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;
