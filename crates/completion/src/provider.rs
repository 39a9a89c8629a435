//! Completion gateway trait and common types.
//!
//! Defines the interface every completion provider implements, plus the
//! settings object shared by all requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{CompletionError, CompletionResult};

/// Environment variable holding the model id.
pub const ENV_MODEL: &str = "OPENAI_MODEL";

/// Environment variable holding the JSON settings object.
pub const ENV_SETTINGS: &str = "OPENAI_SETTINGS";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Request keys owned by the provider; settings may not override them.
const RESERVED_KEYS: &[&str] = &["messages", "response_format"];

/// JSON schema the completion must conform to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    /// Schema name reported to the provider
    pub name: String,
    /// JSON schema document
    pub schema: Value,
    /// Whether the provider must adhere strictly
    pub strict: bool,
}

impl ResponseSchema {
    /// A strict schema.
    pub fn strict(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// User prompt
    pub prompt: String,
    /// Output schema; `None` requests free text
    pub schema: Option<ResponseSchema>,
}

impl CompletionRequest {
    /// Free-text request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema: None,
        }
    }

    /// Schema-constrained request.
    pub fn structured(prompt: impl Into<String>, schema: ResponseSchema) -> Self {
        Self {
            prompt: prompt.into(),
            schema: Some(schema),
        }
    }
}

/// What the model produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Free text
    Text(String),
    /// Parsed JSON conforming to the requested schema
    Structured(Value),
    /// The model returned nothing
    Empty,
}

impl Completion {
    /// Whether the model returned nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Model id plus the settings object merged into every request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    /// Model id
    pub model: String,
    /// Extra request parameters (temperature, max_tokens, ...)
    pub params: Map<String, Value>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            params: Map::new(),
        }
    }
}

impl CompletionSettings {
    /// Build settings from a model id and a settings object.
    ///
    /// A `model` key in `params` takes precedence over `model`.
    pub fn new(model: impl Into<String>, mut params: Map<String, Value>) -> CompletionResult<Self> {
        let model = match params.remove("model") {
            Some(Value::String(m)) if !m.is_empty() => m,
            Some(other) => {
                return Err(CompletionError::Settings(format!(
                    "model must be a non-empty string, got {other}"
                )))
            }
            None => model.into(),
        };

        for key in RESERVED_KEYS {
            if params.remove(*key).is_some() {
                warn!(key = %key, "Ignoring reserved key in completion settings");
            }
        }

        Ok(Self { model, params })
    }

    /// Parse a settings object from its JSON text.
    pub fn parse(model: impl Into<String>, settings_json: &str) -> CompletionResult<Self> {
        let value: Value = serde_json::from_str(settings_json)
            .map_err(|e| CompletionError::Settings(e.to_string()))?;
        let Value::Object(params) = value else {
            return Err(CompletionError::Settings(
                "settings must be a JSON object".to_string(),
            ));
        };
        Self::new(model, params)
    }

    /// Load from `OPENAI_MODEL` and `OPENAI_SETTINGS`.
    pub fn from_env() -> CompletionResult<Self> {
        let model = std::env::var(ENV_MODEL)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        match std::env::var(ENV_SETTINGS) {
            Ok(json) if !json.trim().is_empty() => Self::parse(model, &json),
            _ => Self::new(model, Map::new()),
        }
    }
}

/// Trait for completion providers.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Provider name (e.g., "openai").
    fn name(&self) -> &'static str;

    /// Whether the provider has credentials.
    fn is_configured(&self) -> bool;

    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<Completion>;
}

/// Parse structured output, tolerating a surrounding markdown code fence.
pub fn parse_structured(text: &str) -> CompletionResult<Value> {
    let text = text.trim();

    let json_text = if text.starts_with("```json") {
        text.strip_prefix("```json")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else if text.starts_with("```") {
        text.strip_prefix("```")
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(text)
            .trim()
    } else {
        text
    };

    serde_json::from_str(json_text).map_err(|e| {
        CompletionError::Parse(format!("response is not valid JSON: {e}. Response: {text}"))
    })
}
