//! Label event handling.
//!
//! [`Labeler`] runs the whole pipeline for one event: classify the trigger
//! labels, fetch the article, resolve and dispatch the actions, then run
//! the tag or annotation flow.

pub mod annotate;
pub mod tags;

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use completion::CompletionGateway;
use omnivore::{OmnivoreGateway, WebhookEvent};
use tracing::{info, instrument};

use crate::action::resolve;
use crate::classifier::{classify, matches_trigger};
use crate::config::Config;
use crate::dispatch::{dispatch, DispatchDecision};
use crate::error::LabelerError;
use crate::locks::ArticleLocks;

/// Result of a handled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Generated tags were written along with the completion marker.
    TagsAdded {
        page_id: String,
        tags: Vec<String>,
        replacement_label: String,
    },
    /// The model suggested no new tags.
    NoTagsGenerated { page_id: String },
    /// A new note was created.
    NoteCreated { page_id: String, note_id: String },
    /// The existing note was overwritten.
    NoteUpdated { page_id: String, note_id: String },
    /// The model returned no text.
    NoTextGenerated { page_id: String },
    /// No action was pending.
    NoAction { page_id: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagsAdded {
                page_id,
                tags,
                replacement_label,
            } => write!(
                f,
                "Added tags [{}] and '{replacement_label}' to article {page_id}",
                tags.join(", ")
            ),
            Self::NoTagsGenerated { page_id } => {
                write!(f, "No new tags generated for article {page_id}")
            }
            Self::NoteCreated { page_id, note_id } => {
                write!(f, "Created note {note_id} on article {page_id}")
            }
            Self::NoteUpdated { page_id, note_id } => {
                write!(f, "Updated note {note_id} on article {page_id}")
            }
            Self::NoTextGenerated { page_id } => {
                write!(f, "No text generated for article {page_id}")
            }
            Self::NoAction { page_id } => write!(f, "No pending action for article {page_id}"),
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.to_string()).into_response()
    }
}

/// Runs label actions against Omnivore and the completion provider.
pub struct Labeler {
    omnivore: Arc<dyn OmnivoreGateway>,
    completion: Arc<dyn CompletionGateway>,
    locks: ArticleLocks,
    trigger: String,
    default_prompt: Option<String>,
}

impl Labeler {
    /// Create a labeler from its gateways and the service configuration.
    pub fn new(
        omnivore: Arc<dyn OmnivoreGateway>,
        completion: Arc<dyn CompletionGateway>,
        config: &Config,
    ) -> Self {
        Self {
            omnivore,
            completion,
            locks: ArticleLocks::new(),
            trigger: config.trigger.clone(),
            default_prompt: config.default_prompt.clone(),
        }
    }

    /// Whether the completion provider has credentials.
    #[must_use]
    pub fn completion_configured(&self) -> bool {
        self.completion.is_configured()
    }

    /// Handle a webhook delivery.
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<Outcome, LabelerError> {
        let page_id = event.page_id().ok_or(LabelerError::MissingArticleId)?;
        let names = classify(event.labels(), &self.trigger);
        self.handle_labels(page_id, &names).await
    }

    /// Handle a manual trigger; names not matching the trigger are ignored.
    pub async fn handle_trigger(
        &self,
        page_id: &str,
        labels: &[String],
    ) -> Result<Outcome, LabelerError> {
        if page_id.is_empty() {
            return Err(LabelerError::MissingArticleId);
        }
        let names: Vec<String> = labels
            .iter()
            .filter(|name| matches_trigger(name, &self.trigger))
            .cloned()
            .collect();
        self.handle_labels(page_id, &names).await
    }

    /// Run the pipeline for already classified trigger label names.
    #[instrument(skip(self, names), fields(page_id = %page_id))]
    pub async fn handle_labels(
        &self,
        page_id: &str,
        names: &[String],
    ) -> Result<Outcome, LabelerError> {
        if names.is_empty() {
            return Err(LabelerError::NoMatchingLabels {
                trigger: self.trigger.clone(),
            });
        }
        info!(labels = ?names, "Processing trigger labels");

        let article = self
            .omnivore
            .fetch_article(page_id)
            .await
            .map_err(LabelerError::Omnivore)?;

        let actions = resolve(
            names,
            &article,
            &self.trigger,
            self.default_prompt.as_deref(),
        );

        match dispatch(actions) {
            DispatchDecision::TagGeneration(action) => {
                info!(label = %action.source_label, "Generating tags");
                tags::generate_tags(
                    self.omnivore.as_ref(),
                    self.completion.as_ref(),
                    &article,
                    &action,
                )
                .await
            }
            DispatchDecision::Annotation(action) => {
                info!(
                    label = %action.source_label,
                    operation = %action.operation,
                    "Generating note"
                );
                let _guard = self.locks.lock(&article.id).await;
                annotate::annotate(
                    self.omnivore.as_ref(),
                    self.completion.as_ref(),
                    &article,
                    &action,
                )
                .await
            }
            DispatchDecision::NoAction => Ok(Outcome::NoAction {
                page_id: article.id,
            }),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{article, label, note};
    use super::*;
    use completion::{Completion, MockCompletionGateway};
    use omnivore::MockOmnivoreGateway;
    use serde_json::json;

    fn config() -> Config {
        Config {
            port: 0,
            trigger: "do".to_string(),
            default_prompt: None,
            omnivore_api_key: None,
            omnivore_api_url: String::new(),
            completion: completion::CompletionSettings::default(),
        }
    }

    fn event(value: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_missing_article_id() {
        let labeler = Labeler::new(
            Arc::new(MockOmnivoreGateway::new()),
            Arc::new(MockCompletionGateway::new()),
            &config(),
        );
        let err = labeler
            .handle_event(&event(json!({ "action": "created", "label": { "labels": [] } })))
            .await
            .unwrap_err();
        assert!(matches!(err, LabelerError::MissingArticleId));
    }

    #[tokio::test]
    async fn test_no_matching_labels_skips_upstream() {
        let mut omnivore = MockOmnivoreGateway::new();
        omnivore.expect_fetch_article().never();
        let labeler = Labeler::new(
            Arc::new(omnivore),
            Arc::new(MockCompletionGateway::new()),
            &config(),
        );

        let err = labeler
            .handle_event(&event(json!({
                "action": "created",
                "label": { "pageId": "page-1", "labels": [{ "name": "news" }, { "name": "did:tags" }] }
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, LabelerError::NoMatchingLabels { .. }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_upstream_error() {
        let mut omnivore = MockOmnivoreGateway::new();
        omnivore
            .expect_fetch_article()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let labeler = Labeler::new(
            Arc::new(omnivore),
            Arc::new(MockCompletionGateway::new()),
            &config(),
        );

        let err = labeler
            .handle_labels("page-1", &["do:summary".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_tags_take_precedence_over_summary() {
        let mut omnivore = MockOmnivoreGateway::new();
        omnivore
            .expect_fetch_article()
            .withf(|page_id| page_id == "page-1")
            .returning(|_| Ok(article(vec![label("x", None)])));
        omnivore
            .expect_fetch_all_labels()
            .returning(|| Ok(vec![label("x", None), label("y", None)]));
        omnivore.expect_create_note().never();
        omnivore.expect_update_note().never();
        omnivore
            .expect_set_labels()
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let mut completion = MockCompletionGateway::new();
        completion
            .expect_complete()
            .withf(|request| request.schema.is_some())
            .times(1)
            .returning(|_| {
                Ok(Completion::Structured(
                    json!({ "tags": [{ "name": "y", "description": "" }] }),
                ))
            });

        let labeler = Labeler::new(Arc::new(omnivore), Arc::new(completion), &config());
        let outcome = labeler
            .handle_event(&event(json!({
                "action": "created",
                "label": {
                    "pageId": "page-1",
                    "labels": [{ "name": "do:summary" }, { "name": "do:tags" }]
                }
            })))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::TagsAdded {
                page_id: "page-1".to_string(),
                tags: vec!["y".to_string()],
                replacement_label: "did:tags".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_trigger_filters_names_and_annotates() {
        let mut omnivore = MockOmnivoreGateway::new();
        omnivore
            .expect_fetch_article()
            .returning(|_| Ok(article(vec![])));
        omnivore.expect_update_note().never();
        omnivore
            .expect_create_note()
            .withf(|new_note| new_note.annotation == "Short summary")
            .times(1)
            .returning(|new_note| Ok(note(&new_note.id, &new_note.annotation)));

        let mut completion = MockCompletionGateway::new();
        completion
            .expect_complete()
            .withf(|request| request.schema.is_none())
            .returning(|_| Ok(Completion::Text("Short summary".to_string())));

        let labeler = Labeler::new(Arc::new(omnivore), Arc::new(completion), &config());
        let outcome = labeler
            .handle_trigger(
                "page-1",
                &["reading".to_string(), "do:summary".to_string()],
            )
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::NoteCreated { .. }));
    }

    #[tokio::test]
    async fn test_trigger_without_matching_names() {
        let labeler = Labeler::new(
            Arc::new(MockOmnivoreGateway::new()),
            Arc::new(MockCompletionGateway::new()),
            &config(),
        );
        let err = labeler
            .handle_trigger("page-1", &["reading".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, LabelerError::NoMatchingLabels { .. }));
    }

    #[test]
    fn test_outcome_messages() {
        let outcome = Outcome::TagsAdded {
            page_id: "page-1".to_string(),
            tags: vec!["rust".to_string(), "memory".to_string()],
            replacement_label: "did:tags".to_string(),
        };
        assert_eq!(
            outcome.to_string(),
            "Added tags [rust, memory] and 'did:tags' to article page-1"
        );
        assert_eq!(
            Outcome::NoTextGenerated {
                page_id: "p".to_string()
            }
            .to_string(),
            "No text generated for article p"
        );
    }
}
