//! Configuration for the label automation service.

use completion::{CompletionResult, CompletionSettings};
use omnivore::client::OMNIVORE_API_URL;
use std::env;

/// Default trigger label prefix.
pub const DEFAULT_TRIGGER: &str = "do";

/// Label automation configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Trigger label prefix (`do` matches `do` and `do:*`).
    pub trigger: String,
    /// Prompt used when a trigger label has no description.
    pub default_prompt: Option<String>,
    /// Omnivore API key, forwarded as the `Authorization` header.
    pub omnivore_api_key: Option<String>,
    /// Omnivore GraphQL endpoint.
    pub omnivore_api_url: String,
    /// Model and settings object for every completion.
    pub completion: CompletionSettings,
}

impl Config {
    /// Load the configuration from the environment.
    ///
    /// # Errors
    /// Returns error if `OPENAI_SETTINGS` is not a valid JSON object
    pub fn from_env() -> CompletionResult<Self> {
        Ok(Self {
            port: env::var("LABELER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            trigger: env::var("OMNIVORE_LABEL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_TRIGGER.to_string()),
            default_prompt: env::var("OPENAI_PROMPT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            omnivore_api_key: env::var("OMNIVORE_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            omnivore_api_url: env::var("OMNIVORE_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| OMNIVORE_API_URL.to_string()),
            completion: CompletionSettings::from_env()?,
        })
    }
}
