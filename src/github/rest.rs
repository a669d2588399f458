// src/github/rest.rs
// =============================================================================
// Fetches issues through GitHub's REST API.
//
// How it works:
// 1. List /repos/{owner}/{repo}/issues page by page (page=1, 2, ...),
//    oldest first, until GitHub returns an empty page
// 2. Drop pull requests (the issues endpoint returns those too)
// 3. For every issue with comments, page through its comments endpoint
//
// Rate limits are handled differently in the two loops:
// - listing: fatal, we report the reset time and stop
// - comments: we are already partway through a large collection, so we
//   sleep until the reset and retry the same page (up to a cap)
//
// The REST API has no repository discussions listing; asking this fetcher
// for discussions is an error.
// =============================================================================

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::client::{wait_duration, GitHubClient};
use super::Fetcher;
use crate::config::FetchOptions;
use crate::error::{ExportError, Result};
use crate::model::{Author, Comment, Item, ItemKind, ItemState, Reactions, RepoCoords};

// ---- wire format -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RestUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RestLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RestMilestone {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct RestReactions {
    #[serde(rename = "+1", default)]
    plus_one: u32,
    #[serde(rename = "-1", default)]
    minus_one: u32,
    #[serde(default)]
    laugh: u32,
    #[serde(default)]
    hooray: u32,
    #[serde(default)]
    confused: u32,
    #[serde(default)]
    heart: u32,
    #[serde(default)]
    rocket: u32,
    #[serde(default)]
    eyes: u32,
}

impl From<RestReactions> for Reactions {
    fn from(r: RestReactions) -> Self {
        Reactions {
            plus_one: r.plus_one,
            minus_one: r.minus_one,
            laugh: r.laugh,
            hooray: r.hooray,
            confused: r.confused,
            heart: r.heart,
            rocket: r.rocket,
            eyes: r.eyes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RestIssue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    user: Option<RestUser>,
    created_at: String,
    updated_at: String,
    closed_at: Option<String>,
    html_url: String,
    #[serde(default)]
    labels: Vec<RestLabel>,
    #[serde(default)]
    assignees: Vec<RestUser>,
    milestone: Option<RestMilestone>,
    /// Comment count, lets us skip the comments request entirely
    #[serde(default)]
    comments: u64,
    reactions: Option<RestReactions>,
    /// Present only on pull requests
    pull_request: Option<serde_json::Value>,
}

impl RestIssue {
    fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    fn into_item(self, comments: Vec<Comment>) -> Item {
        Item {
            kind: ItemKind::Issue,
            number: self.number,
            title: self.title,
            body: self.body,
            state: ItemState::from_api(&self.state),
            author: Author::from_login(self.user.map(|u| u.login)),
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            url: self.html_url,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            assignees: self.assignees.into_iter().map(|u| u.login).collect(),
            milestone: self.milestone.map(|m| m.title),
            category: None,
            reactions: self.reactions.map(Reactions::from).unwrap_or_default(),
            comments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RestComment {
    user: Option<RestUser>,
    body: Option<String>,
    created_at: String,
    reactions: Option<RestReactions>,
}

impl From<RestComment> for Comment {
    fn from(c: RestComment) -> Self {
        Comment {
            author: Author::from_login(c.user.map(|u| u.login)),
            body: c.body,
            created_at: c.created_at,
            reactions: c.reactions.map(Reactions::from).unwrap_or_default(),
            replies: Vec::new(),
        }
    }
}

// ---- fetcher ---------------------------------------------------------------

pub struct RestFetcher {
    client: GitHubClient,
    options: FetchOptions,
}

impl RestFetcher {
    pub fn new(client: GitHubClient, options: FetchOptions) -> Self {
        Self { client, options }
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.options.api_base, path))?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    async fn fetch_issues(&self, repo: &RepoCoords) -> Result<Vec<Item>> {
        let listed = self.list_issues(repo).await?;
        let total = listed.len();
        info!(total, "listed issues, fetching comments");

        let mut items = Vec::with_capacity(total);
        for (i, issue) in listed.into_iter().enumerate() {
            info!(
                "[{}/{}] issue #{}: {}",
                i + 1,
                total,
                issue.number,
                issue.title.chars().take(50).collect::<String>()
            );

            let comments = if issue.comments == 0 {
                Vec::new()
            } else {
                let comments = self.fetch_comments(repo, issue.number).await?;
                debug!(number = issue.number, count = comments.len(), "comments fetched");
                comments
            };

            items.push(issue.into_item(comments));
            tokio::time::sleep(self.options.comment_delay).await;
        }

        Ok(items)
    }

    // The bulk listing loop. Any error, rate limits included, ends the run.
    async fn list_issues(&self, repo: &RepoCoords) -> Result<Vec<RestIssue>> {
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1u32;

        loop {
            let url = self.endpoint(
                &path,
                &[
                    ("state", "all".to_string()),
                    ("per_page", self.options.rest_page_size.to_string()),
                    ("page", page.to_string()),
                    ("sort", "created".to_string()),
                    ("direction", "asc".to_string()),
                ],
            )?;

            info!(page, "fetching issues page");
            let batch: Vec<RestIssue> = self.client.get_json(url).await?;
            if batch.is_empty() {
                break;
            }

            let before = issues.len();
            for issue in batch {
                if issue.is_pull_request() {
                    continue;
                }
                // Page numbers shift if something is inserted mid-run
                if !seen.insert(issue.number) {
                    debug!(number = issue.number, "duplicate issue across pages, skipping");
                    continue;
                }
                issues.push(issue);
            }
            info!(
                page,
                found = issues.len() - before,
                total = issues.len(),
                "issues page done"
            );

            page += 1;
            tokio::time::sleep(self.options.page_delay).await;
        }

        Ok(issues)
    }

    // The per-issue loop. Rate limits are waited out, not fatal.
    async fn fetch_comments(&self, repo: &RepoCoords, number: u64) -> Result<Vec<Comment>> {
        let path = format!("/repos/{}/{}/issues/{}/comments", repo.owner, repo.name, number);
        let mut comments = Vec::new();
        let mut page = 1u32;
        let mut waits = 0u32;

        loop {
            let url = self.endpoint(
                &path,
                &[
                    ("per_page", self.options.rest_page_size.to_string()),
                    ("page", page.to_string()),
                ],
            )?;

            let batch: Vec<RestComment> = match self.client.get_json(url).await {
                Ok(batch) => batch,
                Err(ExportError::RateLimited { reset_at })
                    if waits < self.options.max_rate_limit_retries =>
                {
                    waits += 1;
                    let wait =
                        wait_duration(reset_at, Utc::now(), self.options.min_rate_limit_wait);
                    warn!(
                        number,
                        page,
                        attempt = waits,
                        "rate limited, waiting {} seconds",
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(err) => return Err(err),
            };
            waits = 0;

            if batch.is_empty() {
                break;
            }
            comments.extend(batch.into_iter().map(Comment::from));

            page += 1;
            tokio::time::sleep(self.options.comment_delay).await;
        }

        Ok(comments)
    }
}

#[async_trait]
impl Fetcher for RestFetcher {
    fn name(&self) -> &'static str {
        "REST"
    }

    async fn fetch_items(&self, repo: &RepoCoords, kind: ItemKind) -> Result<Vec<Item>> {
        match kind {
            ItemKind::Issue => self.fetch_issues(repo).await,
            ItemKind::Discussion => Err(ExportError::Unsupported {
                api: self.name(),
                kind,
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why `match` on the error in fetch_comments?
//    - Most errors should bubble up with `?`
//    - One specific case (RateLimited) should be handled right here
//    - A match arm with a guard (`if waits < ...`) lets us catch just that
//      case and let everything else fall through to `Err(err) => return`
//
// 2. What does `continue` do inside `loop`?
//    - Jumps back to the top of the loop without running the rest
//    - Here it retries the same page, because `page` was not incremented
//
// 3. Why HashSet for `seen`?
//    - insert() returns false if the value was already there
//    - So `!seen.insert(n)` reads as "we've had this one before"
//
// 4. Why #[serde(rename = "+1")]?
//    - "+1" is not a valid Rust identifier
//    - rename maps the JSON key onto a field name we can actually write
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::test_support::{fast_options, issue_json};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ISSUES: &str = "/repos/molstar/molstar/issues";

    fn repo() -> RepoCoords {
        RepoCoords::new("molstar", "molstar")
    }

    fn fetcher(server: &MockServer) -> RestFetcher {
        let options = fast_options(&server.uri());
        let client = GitHubClient::new("test-token", Duration::from_secs(5)).unwrap();
        RestFetcher::new(client, options)
    }

    async fn mount_page(server: &MockServer, page: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(ISSUES))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_lists_issues_in_order_without_pull_requests() {
        let server = MockServer::start().await;
        let mut pr = issue_json(2, "A pull request", 0);
        pr["pull_request"] = json!({ "url": "https://api.github.com/pulls/2" });

        mount_page(&server, "1", json!([issue_json(1, "First", 0), pr])).await;
        mount_page(&server, "2", json!([issue_json(3, "Third", 0)])).await;
        mount_page(&server, "3", json!([])).await;

        let items = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Issue)
            .await
            .unwrap();

        let numbers: Vec<u64> = items.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(items[0].title, "First");
        assert_eq!(items[0].labels, vec!["bug".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_numbers_across_pages_are_dropped() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([issue_json(1, "One", 0), issue_json(2, "Two", 0)])).await;
        mount_page(&server, "2", json!([issue_json(2, "Two", 0), issue_json(3, "Three", 0)])).await;
        mount_page(&server, "3", json!([])).await;

        let items = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Issue)
            .await
            .unwrap();

        let numbers: Vec<u64> = items.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetches_comments_only_when_present() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([issue_json(7, "Has comments", 2), issue_json(8, "Quiet", 0)])).await;
        mount_page(&server, "2", json!([])).await;

        let comments_path = format!("{ISSUES}/7/comments");
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user": { "login": "alice" }, "body": "first", "created_at": "2024-01-01T00:00:00Z",
                  "reactions": { "+1": 2, "heart": 1 } },
                { "user": null, "body": null, "created_at": "2024-01-02T00:00:00Z" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        // Issue 8 reports zero comments, so its endpoint must never be hit
        Mock::given(method("GET"))
            .and(path(format!("{ISSUES}/8/comments").as_str()))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let items = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Issue)
            .await
            .unwrap();

        assert_eq!(items[0].comments.len(), 2);
        assert_eq!(items[0].comments[0].reactions.non_zero(), vec![("+1", 2), ("heart", 1)]);
        assert_eq!(items[0].comments[1].author, Author::Deleted);
        assert!(items[1].comments.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_while_listing_is_fatal() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([issue_json(1, "One", 0)])).await;
        mount_page(&server, "2", json!([issue_json(2, "Two", 0)])).await;
        Mock::given(method("GET"))
            .and(path(ISSUES))
            .and(query_param("page", "3"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1700000000"),
            )
            .mount(&server)
            .await;

        let err = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Issue)
            .await
            .unwrap_err();

        match err {
            ExportError::RateLimited { reset_at } => {
                assert_eq!(reset_at.timestamp(), 1_700_000_000);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_on_comments_waits_and_retries() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([issue_json(5, "Busy", 1)])).await;
        mount_page(&server, "2", json!([])).await;

        let comments_path = format!("{ISSUES}/5/comments");
        // First attempt is rate limited with a reset in the past
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1"),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user": { "login": "bob" }, "body": "hi", "created_at": "2024-01-01T00:00:00Z" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let items = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Issue)
            .await
            .unwrap();

        assert_eq!(items[0].comments.len(), 1);
        assert_eq!(items[0].comments[0].author, Author::Known("bob".to_string()));
    }

    #[tokio::test]
    async fn test_secondary_rate_limit_on_comments_is_retried() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([issue_json(6, "Popular", 1)])).await;
        mount_page(&server, "2", json!([])).await;

        let comments_path = format!("{ISSUES}/6/comments");
        // Quota is fine, but GitHub asks us to back off
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("retry-after", "0")
                    .insert_header("x-ratelimit-remaining", "4000"),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user": { "login": "erin" }, "body": "later", "created_at": "2024-01-01T00:00:00Z" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(comments_path.as_str()))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let items = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Issue)
            .await
            .unwrap();

        assert_eq!(items[0].comments.len(), 1);
        assert_eq!(items[0].comments[0].author, Author::Known("erin".to_string()));
    }

    #[tokio::test]
    async fn test_comment_retries_are_capped() {
        let server = MockServer::start().await;
        mount_page(&server, "1", json!([issue_json(5, "Busy", 1)])).await;
        mount_page(&server, "2", json!([])).await;
        Mock::given(method("GET"))
            .and(path(format!("{ISSUES}/5/comments").as_str()))
            .respond_with(ResponseTemplate::new(429).insert_header("x-ratelimit-reset", "1"))
            .mount(&server)
            .await;

        let mut fetcher = fetcher(&server);
        fetcher.options.max_rate_limit_retries = 2;
        let err = fetcher.fetch_items(&repo(), ItemKind::Issue).await.unwrap_err();
        assert!(matches!(err, ExportError::RateLimited { .. }));

        // one initial attempt plus two retries
        let hits = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path().ends_with("/comments"))
            .count();
        assert_eq!(hits, 3);
    }

    #[tokio::test]
    async fn test_other_failures_are_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Issue)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::RequestFailed { status, .. } if status.as_u16() == 404
        ));
    }

    #[tokio::test]
    async fn test_discussions_are_unsupported() {
        let server = MockServer::start().await;
        let err = fetcher(&server)
            .fetch_items(&repo(), ItemKind::Discussion)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Unsupported { .. }));
    }
}
