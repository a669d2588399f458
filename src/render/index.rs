// src/render/index.rs
// =============================================================================
// Renders the `_index.txt` summary for a whole collection.
//
// Issues get one flat list in fetch (creation) order. Discussions are grouped
// by category, categories sorted by name, each with its own count.
//
// The generation timestamp is passed in rather than read from the clock, so
// the same inputs always render the same text.
// =============================================================================

use std::collections::BTreeMap;

use crate::model::{Item, ItemKind, ItemState, RepoCoords};

const UNCATEGORIZED: &str = "Uncategorized";

// Open/closed tallies for a collection. total == open + closed always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub open: usize,
    pub closed: usize,
}

impl Counts {
    pub fn of(items: &[Item]) -> Self {
        let open = items.iter().filter(|i| i.state == ItemState::Open).count();
        Self {
            total: items.len(),
            open,
            closed: items.len() - open,
        }
    }
}

pub fn render_index(kind: ItemKind, repo: &RepoCoords, items: &[Item], generated_at: &str) -> String {
    let counts = Counts::of(items);
    let mut out = String::new();

    out.push_str(&format!("# {} Index for {}\n", kind.noun(), repo));
    out.push_str(&format!("Generated: {generated_at}\n"));
    out.push_str(&format!("Total {}: {}\n\n", kind.plural(), counts.total));
    out.push_str(&format!("Open: {}\n", counts.open));
    out.push_str(&format!("Closed: {}\n\n", counts.closed));

    match kind {
        ItemKind::Issue => {
            out.push_str("## All Issues\n\n");
            for item in items {
                out.push_str(&index_line(item));
            }
        }
        ItemKind::Discussion => {
            let mut by_category: BTreeMap<&str, Vec<&Item>> = BTreeMap::new();
            for item in items {
                let category = item.category.as_deref().unwrap_or(UNCATEGORIZED);
                by_category.entry(category).or_default().push(item);
            }

            for (category, members) in by_category {
                out.push_str(&format!("## {} ({})\n\n", category, members.len()));
                for item in members {
                    out.push_str(&index_line(item));
                }
                out.push('\n');
            }
        }
    }

    out
}

// [OPEN] #12: Title [label-a, label-b]
fn index_line(item: &Item) -> String {
    let state = match item.state {
        ItemState::Open => "OPEN",
        ItemState::Closed => "CLOSED",
    };
    let labels = if item.labels.is_empty() {
        String::new()
    } else {
        format!(" [{}]", item.labels.join(", "))
    };
    format!("[{state}] #{}: {}{labels}\n", item.number, item.title)
}
