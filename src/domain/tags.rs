//! Tag input parsing for the admin editor.

/// Split a comma separated tag field.
///
/// Entries are trimmed, blanks are dropped and the typed order is kept.
/// Duplicates are left alone: the editor stores exactly what was typed.
pub fn parse_tag_input(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`parse_tag_input`] used to pre-fill the edit form.
pub fn format_tag_input(tags: &[String]) -> String {
    tags.join(", ")
}
