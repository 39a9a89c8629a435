//! Note annotation flow.

use completion::{Completion, CompletionGateway, CompletionRequest};
use omnivore::{upsert_note, Article, NoteWrite, OmnivoreGateway};
use tracing::{info, instrument};

use super::Outcome;
use crate::action::LabelAction;
use crate::error::LabelerError;
use crate::prompt::assemble;

/// Generate free text for `action` and write it as the article note.
///
/// Callers hold the article lock; the note is read again before a create.
#[instrument(skip_all, fields(page_id = %article.id, label = %action.source_label))]
pub async fn annotate(
    omnivore: &dyn OmnivoreGateway,
    completion: &dyn CompletionGateway,
    article: &Article,
    action: &LabelAction,
) -> Result<Outcome, LabelerError> {
    let prompt = assemble(action.prompt.iter().map(String::as_str));
    let response = completion.complete(CompletionRequest::text(prompt)).await?;

    let text = match response {
        Completion::Text(text) => text,
        Completion::Structured(value) => value.to_string(),
        Completion::Empty => String::new(),
    };
    if text.trim().is_empty() {
        info!("Model returned no text");
        return Ok(Outcome::NoTextGenerated {
            page_id: article.id.clone(),
        });
    }

    let write = upsert_note(omnivore, article, &text)
        .await
        .map_err(LabelerError::Omnivore)?;

    let page_id = article.id.clone();
    let outcome = match write {
        NoteWrite::Updated(note) => Outcome::NoteUpdated {
            page_id,
            note_id: note.id,
        },
        NoteWrite::Created(note) => Outcome::NoteCreated {
            page_id,
            note_id: note.id,
        },
    };
    info!(%outcome, "Note written");
    Ok(outcome)
}
