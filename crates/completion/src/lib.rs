//! Chat completion gateway.
//!
//! [`CompletionGateway`] is the seam the label automation talks to;
//! [`OpenAIProvider`] implements it against any OpenAI-compatible
//! `/chat/completions` endpoint, with optional JSON-schema constrained output.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod openai;
pub mod provider;

pub use error::{CompletionError, CompletionResult};
pub use openai::OpenAIProvider;
#[cfg(any(test, feature = "mock"))]
pub use provider::MockCompletionGateway;
pub use provider::{
    parse_structured, Completion, CompletionGateway, CompletionRequest, CompletionSettings,
    ResponseSchema,
};
