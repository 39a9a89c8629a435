//! OpenAI-compatible chat completion provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{CompletionError, CompletionResult};
use crate::provider::{
    parse_structured, Completion, CompletionGateway, CompletionRequest, CompletionSettings,
    ResponseSchema,
};

/// OpenAI API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// Environment variable holding a custom base URL.
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

/// OpenAI API request message
#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// `json_schema` payload of the response format
#[derive(Debug, Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    schema: &'a Value,
    strict: bool,
}

/// OpenAI API response format
#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaSpec<'a>,
}

impl<'a> From<&'a ResponseSchema> for ResponseFormat<'a> {
    fn from(schema: &'a ResponseSchema) -> Self {
        Self {
            format_type: "json_schema",
            json_schema: JsonSchemaSpec {
                name: &schema.name,
                schema: &schema.schema,
                strict: schema.strict,
            },
        }
    }
}

/// OpenAI API request
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    #[serde(flatten)]
    params: &'a Map<String, Value>,
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

/// OpenAI API response choice message
#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    content: Option<String>,
}

/// OpenAI API response choice
#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// OpenAI API usage
#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI API response
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

/// OpenAI API error
#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

/// OpenAI chat completion provider.
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    settings: CompletionSettings,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with an API key.
    pub fn new(api_key: impl Into<String>, settings: CompletionSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: Some(api_key.into()),
            base_url: OPENAI_BASE_URL.to_string(),
            settings,
        }
    }

    /// Create from `OPENAI_API_KEY` and `OPENAI_BASE_URL`.
    #[must_use]
    pub fn from_env(settings: CompletionSettings) -> Self {
        let api_key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.is_empty());
        let base_url = std::env::var(ENV_BASE_URL)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Self {
            client: Client::new(),
            api_key,
            base_url,
            settings,
        }
    }

    /// Set a custom base URL (Azure OpenAI, proxies, local servers).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> OpenAIRequest<'a> {
        OpenAIRequest {
            params: &self.settings.params,
            model: &self.settings.model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: &request.prompt,
            }],
            response_format: request.schema.as_ref().map(ResponseFormat::from),
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, request), fields(model = %self.settings.model, structured = request.schema.is_some()))]
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<Completion> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| CompletionError::NotConfigured(format!("{ENV_API_KEY} not set")))?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.build_request(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CompletionError::Api {
                provider: "openai",
                status: status.as_u16(),
                message,
            });
        }

        let api_response: OpenAIResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::Parse(format!("Failed to parse response: {e}")))?;

        if let Some(usage) = &api_response.usage {
            debug!(
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        let choice = api_response.choices.into_iter().next();
        if let Some(reason) = choice.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            debug!(finish_reason = %reason, "Completion finished");
        }

        let Some(text) = choice
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
        else {
            return Ok(Completion::Empty);
        };

        if request.schema.is_some() {
            parse_structured(&text).map(Completion::Structured)
        } else {
            Ok(Completion::Text(text.trim().to_string()))
        }
    }
}
