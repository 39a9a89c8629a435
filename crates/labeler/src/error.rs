//! Error types for the label automation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use completion::CompletionError;
use thiserror::Error;

/// Errors raised while handling a label event.
#[derive(Debug, Error)]
pub enum LabelerError {
    /// Body is not a valid webhook or trigger request
    #[error("Invalid request body: {0}")]
    InvalidPayload(String),

    /// Neither `label.pageId` nor `page.id` is present
    #[error("No article id in webhook payload")]
    MissingArticleId,

    /// No label matches the trigger prefix
    #[error("No labels matching '{trigger}' found")]
    NoMatchingLabels { trigger: String },

    /// Omnivore call failed
    #[error("Omnivore request failed: {0:#}")]
    Omnivore(anyhow::Error),

    /// Completion call failed
    #[error("Completion request failed: {0}")]
    Completion(#[from] CompletionError),

    /// The model answered in an unexpected shape
    #[error("Unexpected completion output: {0}")]
    UnexpectedCompletion(String),
}

impl LabelerError {
    /// HTTP status reported for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) | Self::MissingArticleId | Self::NoMatchingLabels { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Omnivore(_) | Self::Completion(_) | Self::UnexpectedCompletion(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LabelerError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
