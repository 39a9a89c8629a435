//! Gateway abstraction over the Omnivore API.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::models::{Article, Highlight, Label, LabelSelection, NewNote};

/// Operations the label automation needs from Omnivore.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait OmnivoreGateway: Send + Sync {
    /// Fetch an article with its labels and highlights.
    async fn fetch_article(&self, page_id: &str) -> Result<Article>;

    /// Fetch every label defined in the workspace.
    async fn fetch_all_labels(&self) -> Result<Vec<Label>>;

    /// Replace the label set of an article.
    async fn set_labels(&self, page_id: &str, labels: LabelSelection) -> Result<Vec<Label>>;

    /// Create a note highlight.
    async fn create_note(&self, note: NewNote) -> Result<Highlight>;

    /// Overwrite the annotation of an existing highlight.
    async fn update_note(&self, highlight_id: &str, annotation: &str) -> Result<Highlight>;
}

/// Result of [`upsert_note`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteWrite {
    /// An existing note was overwritten.
    Updated(Highlight),
    /// A new note was created.
    Created(Highlight),
}

impl NoteWrite {
    /// The written highlight.
    #[must_use]
    pub fn highlight(&self) -> &Highlight {
        match self {
            Self::Updated(h) | Self::Created(h) => h,
        }
    }
}

/// Write `annotation` as the article note.
///
/// When `article` carries no note the article is read again right before
/// creating one, so a note created since `article` was fetched is updated
/// instead of duplicated. Callers serialize calls per article.
pub async fn upsert_note(
    gateway: &dyn OmnivoreGateway,
    article: &Article,
    annotation: &str,
) -> Result<NoteWrite> {
    if let Some(note) = article.existing_note() {
        let highlight = gateway.update_note(&note.id, annotation).await?;
        return Ok(NoteWrite::Updated(highlight));
    }

    let current = gateway.fetch_article(&article.id).await?;
    if let Some(note) = current.existing_note() {
        debug!(page_id = %article.id, note_id = %note.id, "Note appeared since first read");
        let highlight = gateway.update_note(&note.id, annotation).await?;
        return Ok(NoteWrite::Updated(highlight));
    }

    let highlight = gateway
        .create_note(NewNote::new(article.id.clone(), annotation))
        .await?;
    Ok(NoteWrite::Created(highlight))
}
