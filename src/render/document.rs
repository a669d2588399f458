// src/render/document.rs
// =============================================================================
// Renders one issue or discussion into a Markdown-flavoured text document.
//
// Layout (always in this order):
// 1. Title line
// 2. Metadata block
// 3. Description (the body verbatim, or a placeholder - never omitted)
// 4. Comments, only if there is at least one
//
// Comments and replies share one counter. A reply is emitted right after
// its parent comment and before the next top-level comment:
//
//   ### Comment 1
//   ### Comment 2 (reply)
//   ### Comment 3
//
// Output depends only on the Item, so rendering twice gives the same bytes.
// =============================================================================

use crate::model::{Author, Item, ItemKind, Reactions};

pub const NO_DESCRIPTION: &str = "*No description provided*";
pub const EMPTY_COMMENT: &str = "*Empty comment*";

// Renders a single item
pub fn render_item(item: &Item) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# {} #{}: {}", item.kind.noun(), item.number, item.title));
    lines.push(String::new());
    push_metadata(&mut lines, item);

    lines.push(String::new());
    lines.push("## Description".to_string());
    lines.push(String::new());
    lines.push(body_or(item.body.as_deref(), NO_DESCRIPTION));

    if !item.comments.is_empty() {
        push_comments(&mut lines, item);
    }

    lines.join("\n")
}

fn push_metadata(lines: &mut Vec<String>, item: &Item) {
    lines.push("## Metadata".to_string());
    lines.push(format!("- **State**: {}", item.state.as_str()));
    lines.push(format!("- **Author**: {}", item.author));
    lines.push(format!("- **Created**: {}", item.created_at));
    lines.push(format!("- **Updated**: {}", item.updated_at));
    if let Some(closed_at) = &item.closed_at {
        lines.push(format!("- **Closed**: {closed_at}"));
    }
    lines.push(format!("- **URL**: {}", item.url));

    if let Some(category) = &item.category {
        lines.push(format!("- **Category**: {category}"));
    }
    if !item.labels.is_empty() {
        lines.push(format!("- **Labels**: {}", item.labels.join(", ")));
    }
    if item.kind == ItemKind::Issue {
        if !item.assignees.is_empty() {
            lines.push(format!("- **Assignees**: {}", item.assignees.join(", ")));
        }
        if let Some(milestone) = &item.milestone {
            lines.push(format!("- **Milestone**: {milestone}"));
        }
    }
    if let Some(reactions) = reaction_summary(&item.reactions) {
        lines.push(format!("- **Reactions**: {reactions}"));
    }
}

fn push_comments(lines: &mut Vec<String>, item: &Item) {
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(format!("## Comments ({})", item.thread_len()));

    let mut number = 0usize;
    for comment in &item.comments {
        number += 1;
        push_entry(
            lines,
            &format!("Comment {number}"),
            &comment.author,
            &comment.created_at,
            &comment.reactions,
            comment.body.as_deref(),
        );

        for reply in &comment.replies {
            number += 1;
            push_entry(
                lines,
                &format!("Comment {number} (reply)"),
                &reply.author,
                &reply.created_at,
                &reply.reactions,
                reply.body.as_deref(),
            );
        }
    }
}

fn push_entry(
    lines: &mut Vec<String>,
    heading: &str,
    author: &Author,
    created_at: &str,
    reactions: &Reactions,
    body: Option<&str>,
) {
    lines.push(String::new());
    lines.push(format!("### {heading}"));
    lines.push(format!("**Author**: {author}"));
    lines.push(format!("**Date**: {created_at}"));
    if let Some(reactions) = reaction_summary(reactions) {
        lines.push(format!("**Reactions**: {reactions}"));
    }
    lines.push(String::new());
    lines.push(body_or(body, EMPTY_COMMENT));
}

// "+1: 3, heart: 1", or None when nobody reacted
fn reaction_summary(reactions: &Reactions) -> Option<String> {
    let parts: Vec<String> = reactions
        .non_zero()
        .into_iter()
        .map(|(label, count)| format!("{label}: {count}"))
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn body_or(body: Option<&str>, placeholder: &str) -> String {
    match body {
        Some(body) if !body.is_empty() => body.to_string(),
        _ => placeholder.to_string(),
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why collect lines into a Vec<String> and join at the end?
//    - Every section is a handful of lines, some optional
//    - push() the ones we need, then join("\n") once
//    - No trailing newline to worry about
//
// 2. What does `Option<&str>` buy us in body_or?
//    - `item.body.as_deref()` turns Option<String> into Option<&str>
//    - We can look at the body without cloning it
//
// 3. What is `bool::then`?
//    - `cond.then(|| value)` is Some(value) if cond is true, else None
//    - A compact way to say "only if there is something to show"
// -----------------------------------------------------------------------------
