//! Omnivore entity type definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Omnivore label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Unique identifier (absent for labels that have not been created yet)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Label name, e.g. `do:tags`
    pub name: String,
    /// Label color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Free-form description; doubles as the prompt for trigger labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Label {
    /// A label known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: None,
            description: None,
        }
    }

    /// Description, if present and not blank.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
    }
}

/// Highlight type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HighlightType {
    /// Text highlight
    Highlight,
    /// Whole-article note (at most one per article)
    Note,
    /// Redacted span
    Redaction,
    /// Anything newer than this client
    #[serde(other)]
    Unknown,
}

/// Omnivore highlight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Unique identifier
    pub id: String,
    /// Short identifier used in share links
    #[serde(default)]
    pub short_id: Option<String>,
    /// Highlight type
    #[serde(rename = "type")]
    pub highlight_type: HighlightType,
    /// Annotation text
    #[serde(default)]
    pub annotation: Option<String>,
}

impl Highlight {
    /// Whether this highlight is the article note.
    #[must_use]
    pub fn is_note(&self) -> bool {
        self.highlight_type == HighlightType::Note
    }
}

/// Omnivore article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Unique identifier (the webhook `pageId`)
    pub id: String,
    /// Article title
    #[serde(default)]
    pub title: String,
    /// Article content (markdown)
    #[serde(default)]
    pub content: String,
    /// Labels currently on the article
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Highlights, including the note if any
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

impl Article {
    /// The article note, if one exists.
    #[must_use]
    pub fn existing_note(&self) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.is_note())
    }

    /// Find a label on this article by exact name.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.name == name)
    }
}

/// Label as accepted by the `setLabels` mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelInput {
    /// Label name
    pub name: String,
    /// Label color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Label description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Label> for LabelInput {
    fn from(label: &Label) -> Self {
        Self {
            name: label.name.clone(),
            color: label.color.clone(),
            description: label.description.clone(),
        }
    }
}

impl From<Label> for LabelInput {
    fn from(label: Label) -> Self {
        Self {
            name: label.name,
            color: label.color,
            description: label.description,
        }
    }
}

/// What `setLabels` should replace the article's label set with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSelection {
    /// Full label list by name; unknown names are created.
    Names(Vec<LabelInput>),
    /// Existing label IDs.
    Ids(Vec<String>),
}

impl LabelSelection {
    /// Label names, when selecting by name.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Names(labels) => labels.iter().map(|l| l.name.as_str()).collect(),
            Self::Ids(_) => Vec::new(),
        }
    }
}

/// Input for creating an article note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    /// Client-generated highlight ID
    pub id: String,
    /// First 8 characters of `id`
    pub short_id: String,
    /// Article the note belongs to
    pub article_id: String,
    /// Note text
    pub annotation: String,
}

impl NewNote {
    /// Build a note with a freshly generated ID.
    pub fn new(article_id: impl Into<String>, annotation: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let short_id = id.chars().take(8).collect();
        Self {
            id,
            short_id,
            article_id: article_id.into(),
            annotation: annotation.into(),
        }
    }
}
