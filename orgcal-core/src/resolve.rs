//! Categories and task blocking, computed from the outline structure.

use crate::config::{CategorySource, ExportConfig};
use crate::ics::text::escape;
use crate::outline::{EntryId, Outline};

/// CATEGORIES value for an entry: escaped tokens joined with `,`.
///
/// Sources are consulted in configured order; duplicates keep their first
/// position and empty tokens are dropped.
pub fn categories(outline: &Outline, id: EntryId, config: &ExportConfig) -> String {
    let entry = outline.entry(id);
    let mut tokens: Vec<String> = Vec::new();

    for source in &config.categories {
        let found: Vec<String> = match source {
            CategorySource::Category => vec![
                outline
                    .inherited_property(id, "CATEGORY")
                    .unwrap_or(outline.category.as_str())
                    .to_string(),
            ],
            CategorySource::TodoState => entry.todo_keyword.iter().cloned().collect(),
            CategorySource::LocalTags => entry.tags.clone(),
            CategorySource::AllTags => outline.all_tags(id),
        };

        for token in found {
            let token = token.trim();
            if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
    }

    tokens
        .iter()
        .map(|t| escape(t))
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether a task cannot be acted on yet.
///
/// Blocked by any unfinished descendant headline, or by an unfinished
/// earlier sibling under an ORDERED ancestor. The upward walk stops at the
/// first ancestor without a todo keyword.
pub fn is_blocked(outline: &Outline, id: EntryId) -> bool {
    if outline
        .descendants(id)
        .into_iter()
        .any(|d| outline.entry(d).is_active_todo())
    {
        return true;
    }

    let mut current = id;
    for ancestor in outline.ancestors(id) {
        let parent = outline.entry(ancestor);
        if parent.todo_keyword.is_none() {
            return false;
        }
        if parent.is_ordered()
            && outline
                .preceding_siblings(current)
                .any(|s| outline.entry(s).is_active_todo())
        {
            return true;
        }
        current = ancestor;
    }

    false
}
