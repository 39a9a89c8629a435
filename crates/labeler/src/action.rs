//! Label action resolution.
//!
//! Every trigger label on an event becomes one [`LabelAction`]: the
//! operation named after the colon, the prompt fragments for the model, and
//! the `did:*` label that marks the operation as completed.

use omnivore::Article;

/// Prompt used when neither the label nor the configuration provides one.
pub const FALLBACK_PROMPT: &str = "Return a tweet-length TL;DR of the following article.";

/// Namespace of completion marker labels.
pub const COMPLETED_NAMESPACE: &str = "did";

/// The one operation with its own flow.
pub const TAGS_OPERATION: &str = "tags";

/// Which flow handles an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Generate new labels and write them to the article.
    TagGeneration,
    /// Generate free text and write it as the article note.
    Annotation,
}

/// Action derived from one trigger label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAction {
    /// Label that triggered the action, e.g. `do:summary`
    pub source_label: String,
    /// Label marking completion, e.g. `did:summary`
    pub replacement_label: String,
    /// Trigger namespace, e.g. `do`
    pub namespace: String,
    /// Text after the first colon; empty for the bare trigger
    pub operation: String,
    /// Prompt fragments in order: instruction, title, content, note
    pub prompt: Vec<String>,
    /// Description of the source label on the article
    pub description: Option<String>,
    /// Whether the action has been handled
    pub done: bool,
}

impl LabelAction {
    /// Flow that handles this action.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        if self.operation == TAGS_OPERATION {
            ActionKind::TagGeneration
        } else {
            ActionKind::Annotation
        }
    }
}

/// Completion marker for a trigger label.
///
/// `"{trigger}:x"` becomes `"did:x"`; the bare trigger becomes `"did"`.
/// Only the leading trigger namespace is replaced.
#[must_use]
pub fn replacement_label(name: &str, trigger: &str) -> String {
    if name == trigger {
        return COMPLETED_NAMESPACE.to_string();
    }
    match name
        .strip_prefix(trigger)
        .and_then(|rest| rest.strip_prefix(':'))
    {
        Some(operation) => format!("{COMPLETED_NAMESPACE}:{operation}"),
        None => name.to_string(),
    }
}

/// Text after the first colon, or empty.
fn operation(name: &str) -> &str {
    name.split_once(':').map_or("", |(_, operation)| operation)
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.trim().is_empty())
}

/// Resolve the matching label names of an event against the article.
///
/// Yields one action per name, in input order.
#[must_use]
pub fn resolve(
    names: &[String],
    article: &Article,
    trigger: &str,
    default_prompt: Option<&str>,
) -> Vec<LabelAction> {
    names
        .iter()
        .map(|name| {
            let description = article
                .label(name)
                .and_then(|label| label.description())
                .map(str::to_string);

            let template = description
                .as_deref()
                .or_else(|| default_prompt.and_then(non_empty))
                .unwrap_or(FALLBACK_PROMPT);

            let note = article
                .existing_note()
                .and_then(|note| note.annotation.as_deref())
                .and_then(non_empty);

            let prompt = [
                Some(template.to_string()),
                non_empty(&article.title).map(|t| format!("Article title: {t}")),
                non_empty(&article.content).map(|c| format!("Article content: {c}")),
                note.map(|n| format!("Existing note: {n}")),
            ]
            .into_iter()
            .flatten()
            .collect();

            LabelAction {
                source_label: name.clone(),
                replacement_label: replacement_label(name, trigger),
                namespace: trigger.to_string(),
                operation: operation(name).to_string(),
                prompt,
                description,
                done: false,
            }
        })
        .collect()
}
