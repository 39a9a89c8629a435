//! Tag generation flow.

use completion::{
    parse_structured, Completion, CompletionGateway, CompletionRequest, ResponseSchema,
};
use omnivore::{Article, Label, LabelInput, LabelSelection, OmnivoreGateway};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::Outcome;
use crate::action::LabelAction;
use crate::error::LabelerError;
use crate::prompt::assemble;

/// Instruction leading every tag prompt.
pub const TAG_INSTRUCTION: &str = "Suggest labels for the following article. \
Reuse available labels where they fit and only suggest labels the article does not have yet.";

const SCHEMA_NAME: &str = "article_tags";

/// Strict response schema: `{"tags": [{"name", "description"}]}`.
#[must_use]
pub fn tag_schema() -> ResponseSchema {
    ResponseSchema::strict(
        SCHEMA_NAME,
        json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["name", "description"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["tags"],
            "additionalProperties": false
        }),
    )
}

#[derive(Debug, Default, Deserialize)]
struct GeneratedTags {
    #[serde(default)]
    tags: Vec<GeneratedTag>,
}

#[derive(Debug, Deserialize)]
struct GeneratedTag {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<GeneratedTag> for LabelInput {
    fn from(tag: GeneratedTag) -> Self {
        Self {
            name: tag.name.trim().to_string(),
            color: None,
            description: tag.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

fn label_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    Value::from(names.collect::<Vec<_>>()).to_string()
}

/// Build the tag prompt from the action fragments and both label lists.
fn build_prompt(article: &Article, available: &[Label], action: &LabelAction) -> String {
    let existing = label_list(article.labels.iter().map(|l| l.name.as_str()));
    let available = label_list(available.iter().map(|l| l.name.as_str()));

    let fragments = std::iter::once(TAG_INSTRUCTION.to_string())
        .chain(action.prompt.iter().cloned())
        .chain([
            format!("Existing article labels: {existing}"),
            format!("Available labels: {available}"),
        ])
        .collect::<Vec<_>>();
    assemble(fragments.iter().map(String::as_str))
}

fn decode(value: Value) -> Result<GeneratedTags, LabelerError> {
    serde_json::from_value(value)
        .map_err(|e| LabelerError::UnexpectedCompletion(format!("tag response: {e}")))
}

/// Generate tags for `article` and write them with the completion marker.
///
/// The written set is the article's labels, then the generated tags, then
/// the replacement label.
#[instrument(skip_all, fields(page_id = %article.id, label = %action.source_label))]
pub async fn generate_tags(
    omnivore: &dyn OmnivoreGateway,
    completion: &dyn CompletionGateway,
    article: &Article,
    action: &LabelAction,
) -> Result<Outcome, LabelerError> {
    let available = omnivore
        .fetch_all_labels()
        .await
        .map_err(LabelerError::Omnivore)?;
    debug!(available = available.len(), "Fetched workspace labels");

    let prompt = build_prompt(article, &available, action);
    let response = completion
        .complete(CompletionRequest::structured(prompt, tag_schema()))
        .await?;

    let generated = match response {
        Completion::Structured(value) => decode(value)?,
        Completion::Text(text) => decode(
            parse_structured(&text)
                .map_err(|e| LabelerError::UnexpectedCompletion(e.to_string()))?,
        )?,
        Completion::Empty => GeneratedTags::default(),
    };

    let tags: Vec<LabelInput> = generated
        .tags
        .into_iter()
        .map(LabelInput::from)
        .filter(|tag| !tag.name.is_empty())
        .collect();

    if tags.is_empty() {
        info!("Model suggested no tags");
        return Ok(Outcome::NoTagsGenerated {
            page_id: article.id.clone(),
        });
    }

    let tag_names: Vec<String> = tags.iter().map(|t| t.name.clone()).collect();
    let labels: Vec<LabelInput> = article
        .labels
        .iter()
        .map(LabelInput::from)
        .chain(tags)
        .chain(std::iter::once(LabelInput::from(Label::named(
            action.replacement_label.as_str(),
        ))))
        .collect();

    omnivore
        .set_labels(&article.id, LabelSelection::Names(labels))
        .await
        .map_err(LabelerError::Omnivore)?;

    info!(tags = ?tag_names, "Labels written");
    Ok(Outcome::TagsAdded {
        page_id: article.id.clone(),
        tags: tag_names,
        replacement_label: action.replacement_label.clone(),
    })
}
