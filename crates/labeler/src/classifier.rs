//! Trigger label classification.

use serde_json::Value;

/// Whether `name` is the bare trigger or a `"{trigger}:"` variant.
#[must_use]
pub fn matches_trigger(name: &str, trigger: &str) -> bool {
    name == trigger
        || name
            .strip_prefix(trigger)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// Extract the trigger label names from an untyped webhook label list.
///
/// Entries that are not objects with a string `name` are skipped. Order is
/// preserved and duplicates are kept.
#[must_use]
pub fn classify(labels: &[Value], trigger: &str) -> Vec<String> {
    labels
        .iter()
        .filter_map(|label| label.as_object()?.get("name")?.as_str())
        .filter(|name| matches_trigger(name, trigger))
        .map(str::to_string)
        .collect()
}
