//! Turning a model reply into a `Category`

use crate::model::Category;

/// Outcome of parsing a classification reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched(Category),
    /// Several labels named, in reply order
    Ambiguous(Vec<Category>),
    /// No label named; carries the raw reply
    Unrecognized(String),
}

/// Collect the distinct labels named in `reply`.
///
/// The reply is uppercased and split on every character outside `[A-Z0-9_]`,
/// so `"json_sort."` and `"**JSON_SORT**"` both match while a label embedded
/// in a longer token (`"JSON_SORTED"`) does not.
pub fn parse_classification(reply: &str) -> Classification {
    let upper = reply.to_uppercase();
    let mut found: Vec<Category> = Vec::new();

    for token in upper.split(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')) {
        if let Some(category) = Category::from_label(token)
            && !found.contains(&category)
        {
            found.push(category);
        }
    }

    match found.len() {
        0 => Classification::Unrecognized(reply.trim().to_string()),
        1 => Classification::Matched(found[0]),
        _ => Classification::Ambiguous(found),
    }
}
