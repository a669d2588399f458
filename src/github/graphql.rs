// src/github/graphql.rs
// =============================================================================
// Fetches issues and discussions through GitHub's GraphQL API.
//
// Unlike REST, one query returns a page of items together with their
// comments (and, for discussions, the replies to each comment). Pages are
// chained with an opaque cursor: every response carries
// pageInfo { hasNextPage, endCursor } and we pass endCursor back as `after`.
//
// Both queries alias their connection to `items` so one pagination loop
// can walk either collection. Nested comments and replies are capped at
// 100 each; when totalCount says there were more, we log a warning.
//
// Errors:
// - rate limits (HTTP or a RATE_LIMITED GraphQL error) are fatal
// - other GraphQL errors are logged and end the loop; if nothing was
//   fetched yet they become ExportError::GraphQl
// =============================================================================

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use url::Url;

use super::client::GitHubClient;
use super::Fetcher;
use crate::config::FetchOptions;
use crate::error::{ExportError, Result};
use crate::model::{Author, Comment, Item, ItemKind, ItemState, Reactions, RepoCoords, Reply};

const ISSUES_QUERY: &str = r#"
query($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    items: issues(first: $first, after: $after, orderBy: {field: CREATED_AT, direction: ASC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        number title body url state createdAt updatedAt closedAt
        author { login }
        labels(first: 50) { nodes { name } }
        assignees(first: 50) { nodes { login } }
        milestone { title }
        reactionGroups { content reactors { totalCount } }
        comments(first: 100) {
          totalCount
          nodes {
            author { login } body createdAt
            reactionGroups { content reactors { totalCount } }
          }
        }
      }
    }
  }
}
"#;

const DISCUSSIONS_QUERY: &str = r#"
query($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    items: discussions(first: $first, after: $after, orderBy: {field: CREATED_AT, direction: ASC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        number title body url closed createdAt updatedAt closedAt
        author { login }
        category { name }
        labels(first: 50) { nodes { name } }
        reactionGroups { content reactors { totalCount } }
        comments(first: 100) {
          totalCount
          nodes {
            author { login } body createdAt
            reactionGroups { content reactors { totalCount } }
            replies(first: 100) {
              totalCount
              nodes {
                author { login } body createdAt
                reactionGroups { content reactors { totalCount } }
              }
            }
          }
        }
      }
    }
  }
}
"#;

// ---- response envelope -----------------------------------------------------

// `data` stays untyped until `errors` has been looked at: with partial
// errors GitHub nulls out the failing nodes, which the typed nodes reject
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData<N> {
    repository: Option<RepositoryItems<N>>,
}

#[derive(Debug, Deserialize)]
struct RepositoryItems<N> {
    items: Connection<N>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<N> {
    page_info: PageInfo,
    nodes: Vec<N>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

// Nested connections we never paginate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
    #[serde(default)]
    total_count: Option<u32>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            total_count: None,
        }
    }
}

impl<T> Nodes<T> {
    // Server-side total when it is larger than what came back
    fn truncated_total(&self) -> Option<u32> {
        self.total_count
            .filter(|&total| total as usize > self.nodes.len())
    }
}

// Comments and replies past the first 100 are not fetched; say so in the log
fn warn_if_truncated(kind: ItemKind, number: u64, comments: &Nodes<GqlComment>) {
    if let Some(total) = comments.truncated_total() {
        warn!(
            number,
            total,
            kept = comments.nodes.len(),
            "{} has more comments than were fetched",
            kind.noun()
        );
    }
    for (i, comment) in comments.nodes.iter().enumerate() {
        if let Some(total) = comment.replies.truncated_total() {
            warn!(
                number,
                comment = i + 1,
                total,
                kept = comment.replies.nodes.len(),
                "{} comment has more replies than were fetched",
                kind.noun()
            );
        }
    }
}

// ---- node types ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Titled {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct ReactionGroup {
    content: String,
    reactors: TotalCount,
}

fn reactions(groups: Vec<ReactionGroup>) -> Reactions {
    let mut reactions = Reactions::default();
    for group in groups {
        reactions.add_graphql(&group.content, group.reactors.total_count);
    }
    reactions
}

fn author(actor: Option<Actor>) -> Author {
    Author::from_login(actor.map(|a| a.login))
}

// GraphQL returns "" for an empty body; treat it like REST's null
fn non_empty(body: Option<String>) -> Option<String> {
    body.filter(|b| !b.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlComment {
    author: Option<Actor>,
    body: Option<String>,
    created_at: String,
    #[serde(default)]
    reaction_groups: Vec<ReactionGroup>,
    #[serde(default)]
    replies: Nodes<GqlReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlReply {
    author: Option<Actor>,
    body: Option<String>,
    created_at: String,
    #[serde(default)]
    reaction_groups: Vec<ReactionGroup>,
}

impl From<GqlComment> for Comment {
    fn from(c: GqlComment) -> Self {
        Comment {
            author: author(c.author),
            body: non_empty(c.body),
            created_at: c.created_at,
            reactions: reactions(c.reaction_groups),
            replies: c.replies.nodes.into_iter().map(Reply::from).collect(),
        }
    }
}

impl From<GqlReply> for Reply {
    fn from(r: GqlReply) -> Self {
        Reply {
            author: author(r.author),
            body: non_empty(r.body),
            created_at: r.created_at,
            reactions: reactions(r.reaction_groups),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlIssue {
    number: u64,
    title: String,
    body: Option<String>,
    url: String,
    state: String,
    created_at: String,
    updated_at: String,
    closed_at: Option<String>,
    author: Option<Actor>,
    #[serde(default)]
    labels: Option<Nodes<Named>>,
    #[serde(default)]
    assignees: Nodes<Actor>,
    milestone: Option<Titled>,
    #[serde(default)]
    reaction_groups: Vec<ReactionGroup>,
    #[serde(default)]
    comments: Nodes<GqlComment>,
}

impl From<GqlIssue> for Item {
    fn from(i: GqlIssue) -> Self {
        warn_if_truncated(ItemKind::Issue, i.number, &i.comments);
        Item {
            kind: ItemKind::Issue,
            number: i.number,
            title: i.title,
            body: non_empty(i.body),
            state: ItemState::from_api(&i.state),
            author: author(i.author),
            created_at: i.created_at,
            updated_at: i.updated_at,
            closed_at: i.closed_at,
            url: i.url,
            labels: i.labels.unwrap_or_default().nodes.into_iter().map(|l| l.name).collect(),
            assignees: i.assignees.nodes.into_iter().map(|a| a.login).collect(),
            milestone: i.milestone.map(|m| m.title),
            category: None,
            reactions: reactions(i.reaction_groups),
            comments: i.comments.nodes.into_iter().map(Comment::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlDiscussion {
    number: u64,
    title: String,
    body: Option<String>,
    url: String,
    closed: bool,
    created_at: String,
    updated_at: String,
    closed_at: Option<String>,
    author: Option<Actor>,
    category: Option<Named>,
    #[serde(default)]
    labels: Option<Nodes<Named>>,
    #[serde(default)]
    reaction_groups: Vec<ReactionGroup>,
    #[serde(default)]
    comments: Nodes<GqlComment>,
}

impl From<GqlDiscussion> for Item {
    fn from(d: GqlDiscussion) -> Self {
        warn_if_truncated(ItemKind::Discussion, d.number, &d.comments);
        Item {
            kind: ItemKind::Discussion,
            number: d.number,
            title: d.title,
            body: non_empty(d.body),
            state: ItemState::from_closed(d.closed),
            author: author(d.author),
            created_at: d.created_at,
            updated_at: d.updated_at,
            closed_at: d.closed_at,
            url: d.url,
            labels: d.labels.unwrap_or_default().nodes.into_iter().map(|l| l.name).collect(),
            assignees: Vec::new(),
            milestone: None,
            category: d.category.map(|c| c.name),
            reactions: reactions(d.reaction_groups),
            comments: d.comments.nodes.into_iter().map(Comment::from).collect(),
        }
    }
}

// ---- fetcher ---------------------------------------------------------------

pub struct GraphQlFetcher {
    client: GitHubClient,
    options: FetchOptions,
}

impl GraphQlFetcher {
    pub fn new(client: GitHubClient, options: FetchOptions) -> Self {
        Self { client, options }
    }

    // Walks the cursor chain for one collection and returns every node.
    async fn paginate<N: DeserializeOwned>(
        &self,
        repo: &RepoCoords,
        kind: ItemKind,
        query: &str,
    ) -> Result<Vec<N>> {
        let url = Url::parse(&self.options.graphql_url)?;
        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 1u32;

        loop {
            info!(page, "fetching {} page", kind.plural());
            let body = json!({
                "query": query,
                "variables": {
                    "owner": repo.owner,
                    "name": repo.name,
                    "first": self.options.graphql_page_size,
                    "after": cursor,
                },
            });

            let (response, reset_at): (GraphQlResponse, _) =
                self.client.post_json(url.clone(), &body).await?;

            if response
                .errors
                .iter()
                .any(|e| e.kind.as_deref() == Some("RATE_LIMITED"))
            {
                return Err(ExportError::RateLimited {
                    reset_at: reset_at.unwrap_or_else(Utc::now),
                });
            }

            if !response.errors.is_empty() {
                let messages: Vec<String> =
                    response.errors.into_iter().map(|e| e.message).collect();
                for message in &messages {
                    error!(page, "GraphQL error: {message}");
                }
                if nodes.is_empty() {
                    return Err(ExportError::GraphQl { messages });
                }
                warn!(page, fetched = nodes.len(), "stopping {} fetch early", kind.plural());
                break;
            }

            let data: Option<RepositoryData<N>> = match response.data {
                Some(data) => serde_json::from_value(data)?,
                None => None,
            };
            let Some(connection) = data
                .and_then(|data| data.repository)
                .map(|repository| repository.items)
            else {
                warn!(page, "no data in GraphQL response, stopping");
                break;
            };

            nodes.extend(connection.nodes);
            info!(page, total = nodes.len(), "{} page done", kind.plural());

            match connection.page_info.end_cursor {
                Some(next) if connection.page_info.has_next_page => cursor = Some(next),
                _ => break,
            }

            page += 1;
            tokio::time::sleep(self.options.page_delay).await;
        }

        Ok(nodes)
    }
}

#[async_trait]
impl Fetcher for GraphQlFetcher {
    fn name(&self) -> &'static str {
        "GraphQL"
    }

    async fn fetch_items(&self, repo: &RepoCoords, kind: ItemKind) -> Result<Vec<Item>> {
        let items = match kind {
            ItemKind::Issue => self
                .paginate::<GqlIssue>(repo, kind, ISSUES_QUERY)
                .await?
                .into_iter()
                .map(Item::from)
                .collect(),
            ItemKind::Discussion => self
                .paginate::<GqlDiscussion>(repo, kind, DISCUSSIONS_QUERY)
                .await?
                .into_iter()
                .map(Item::from)
                .collect(),
        };
        Ok(items)
    }
}
