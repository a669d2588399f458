// src/output/filename.rs
// =============================================================================
// Derives a stable, filesystem-friendly filename for each item.
//
//   issue_0042_Fix crash on load__.txt
//   discussion_0007_How do I load a PDB file_.txt
//
// Rules for the title part:
// - letters, digits, space, '-' and '_' are kept
// - everything else becomes '_'
// - at most 50 characters, then surrounding whitespace is trimmed
// =============================================================================

use crate::model::Item;

pub const MAX_TITLE_CHARS: usize = 50;

pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TITLE_CHARS)
        .collect();
    replaced.trim().to_string()
}

pub fn item_filename(item: &Item) -> String {
    format!(
        "{}_{:04}_{}.txt",
        item.kind.prefix(),
        item.number,
        sanitize_title(&item.title)
    )
}
