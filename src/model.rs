// src/model.rs
// =============================================================================
// The shape every fetcher produces and the renderer consumes.
//
// Both the REST and the GraphQL fetchers convert GitHub's wire format into
// these types, so one renderer serves both. Items are immutable snapshots:
// built once during the fetch, never mutated afterwards.
// =============================================================================

use std::fmt;

/// Which collection an item belongs to.
///
/// Issue numbers and discussion numbers live in separate namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Issue,
    Discussion,
}

impl ItemKind {
    /// Filename prefix, e.g. `issue_0042_...`
    pub fn prefix(self) -> &'static str {
        match self {
            ItemKind::Issue => "issue",
            ItemKind::Discussion => "discussion",
        }
    }

    /// Display noun for headings
    pub fn noun(self) -> &'static str {
        match self {
            ItemKind::Issue => "Issue",
            ItemKind::Discussion => "Discussion",
        }
    }

    /// Lowercase plural, also the output sub-directory name
    pub fn plural(self) -> &'static str {
        match self {
            ItemKind::Issue => "issues",
            ItemKind::Discussion => "discussions",
        }
    }
}

/// Who wrote something.
///
/// GitHub returns `null` for accounts that have since been deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    Known(String),
    Deleted,
}

impl Author {
    /// GitHub shows deleted accounts as "ghost", so do we
    pub const DELETED_PLACEHOLDER: &'static str = "ghost";

    pub fn from_login(login: Option<String>) -> Self {
        match login {
            Some(login) if !login.is_empty() => Author::Known(login),
            _ => Author::Deleted,
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::Known(login) => f.write_str(login),
            Author::Deleted => f.write_str(Self::DELETED_PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    // REST sends "open" / "closed", GraphQL sends "OPEN" / "CLOSED"
    pub fn from_api(state: &str) -> Self {
        if state.eq_ignore_ascii_case("closed") {
            ItemState::Closed
        } else {
            ItemState::Open
        }
    }

    // Discussions only carry a `closed` flag
    pub fn from_closed(closed: bool) -> Self {
        if closed {
            ItemState::Closed
        } else {
            ItemState::Open
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemState::Open => "open",
            ItemState::Closed => "closed",
        }
    }
}

/// Reaction counts in GitHub's canonical display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reactions {
    pub plus_one: u32,
    pub minus_one: u32,
    pub laugh: u32,
    pub hooray: u32,
    pub confused: u32,
    pub heart: u32,
    pub rocket: u32,
    pub eyes: u32,
}

impl Reactions {
    /// (label, count) pairs for the non-zero reactions, in display order
    pub fn non_zero(&self) -> Vec<(&'static str, u32)> {
        [
            ("+1", self.plus_one),
            ("-1", self.minus_one),
            ("laugh", self.laugh),
            ("hooray", self.hooray),
            ("confused", self.confused),
            ("heart", self.heart),
            ("rocket", self.rocket),
            ("eyes", self.eyes),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }

    // GraphQL names reactions by enum (THUMBS_UP, ...); unknown ones are ignored
    pub fn add_graphql(&mut self, content: &str, count: u32) {
        let slot = match content {
            "THUMBS_UP" => &mut self.plus_one,
            "THUMBS_DOWN" => &mut self.minus_one,
            "LAUGH" => &mut self.laugh,
            "HOORAY" => &mut self.hooray,
            "CONFUSED" => &mut self.confused,
            "HEART" => &mut self.heart,
            "ROCKET" => &mut self.rocket,
            "EYES" => &mut self.eyes,
            _ => return,
        };
        *slot += count;
    }
}

/// A reply to a discussion comment. Replies cannot have replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub author: Author,
    pub body: Option<String>,
    pub created_at: String,
    pub reactions: Reactions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: Author,
    pub body: Option<String>,
    pub created_at: String,
    pub reactions: Reactions,
    /// Always empty for issue comments
    pub replies: Vec<Reply>,
}

impl Comment {
    /// Number of entries this comment contributes to the flattened thread
    pub fn thread_len(&self) -> usize {
        1 + self.replies.len()
    }
}

/// One issue or discussion, fully populated with its comment thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: ItemState,
    pub author: Author,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
    pub url: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub milestone: Option<String>,
    pub category: Option<String>,
    pub reactions: Reactions,
    pub comments: Vec<Comment>,
}

impl Item {
    /// Comments plus replies, i.e. the number shown in "## Comments (N)"
    pub fn thread_len(&self) -> usize {
        self.comments.iter().map(Comment::thread_len).sum()
    }
}

/// The repository we export from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoords {
    pub owner: String,
    pub name: String,
}

impl RepoCoords {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    // Small builders shared by the renderer and writer tests
    use super::*;

    pub fn issue(number: u64, title: &str) -> Item {
        Item {
            kind: ItemKind::Issue,
            number,
            title: title.to_string(),
            body: None,
            state: ItemState::Open,
            author: Author::Known("octocat".to_string()),
            created_at: "2024-01-02T03:04:05Z".to_string(),
            updated_at: "2024-01-03T03:04:05Z".to_string(),
            closed_at: None,
            url: format!("https://github.com/molstar/molstar/issues/{number}"),
            labels: Vec::new(),
            assignees: Vec::new(),
            milestone: None,
            category: None,
            reactions: Reactions::default(),
            comments: Vec::new(),
        }
    }

    pub fn discussion(number: u64, title: &str, category: Option<&str>) -> Item {
        Item {
            kind: ItemKind::Discussion,
            url: format!("https://github.com/molstar/molstar/discussions/{number}"),
            category: category.map(str::to_string),
            ..issue(number, title)
        }
    }

    pub fn comment(author: &str, body: &str) -> Comment {
        Comment {
            author: Author::Known(author.to_string()),
            body: Some(body.to_string()),
            created_at: "2024-02-01T00:00:00Z".to_string(),
            reactions: Reactions::default(),
            replies: Vec::new(),
        }
    }

    pub fn reply(author: &str, body: &str) -> Reply {
        Reply {
            author: Author::Known(author.to_string()),
            body: Some(body.to_string()),
            created_at: "2024-02-02T00:00:00Z".to_string(),
            reactions: Reactions::default(),
        }
    }
}
