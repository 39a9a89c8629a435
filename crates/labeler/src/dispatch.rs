//! Action dispatch.
//!
//! At most one action runs per webhook delivery. Tag generation wins over
//! everything else; otherwise the first pending action is annotated. Any
//! other trigger label stays on the article until a later delivery.

use crate::action::{ActionKind, LabelAction};

/// What to run for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Generate tags for the first `tags` action.
    TagGeneration(LabelAction),
    /// Generate a note for the first pending action.
    Annotation(LabelAction),
    /// Nothing to do.
    NoAction,
}

/// Pick the action to run.
#[must_use]
pub fn dispatch(actions: Vec<LabelAction>) -> DispatchDecision {
    let mut annotation = None;

    for action in actions {
        match action.kind() {
            ActionKind::TagGeneration => return DispatchDecision::TagGeneration(action),
            ActionKind::Annotation => {
                if annotation.is_none() && !action.done {
                    annotation = Some(action);
                }
            }
        }
    }

    annotation.map_or(DispatchDecision::NoAction, DispatchDecision::Annotation)
}
