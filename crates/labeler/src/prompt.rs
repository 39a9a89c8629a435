//! Prompt assembly.

/// Join prompt fragments into a bullet list.
///
/// Missing and blank fragments are dropped; every other fragment becomes a
/// `"- "` line.
pub fn assemble<'a, I>(fragments: I) -> String
where
    I: IntoIterator,
    I::Item: Into<Option<&'a str>>,
{
    fragments
        .into_iter()
        .filter_map(|fragment| -> Option<&'a str> { fragment.into() })
        .filter(|fragment| !fragment.trim().is_empty())
        .map(|fragment| format!("- {fragment}"))
        .collect::<Vec<_>>()
        .join("\n")
}
