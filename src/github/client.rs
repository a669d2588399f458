// src/github/client.rs
// =============================================================================
// Shared HTTP plumbing for talking to GitHub.
//
// Both fetchers go through GitHubClient so they agree on:
// - authentication (bearer token) and the headers GitHub wants
// - how a response is classified: success, rate limited, or failed
// - how long to wait when a rate limit is retried
//
// Rate limit detection:
// - HTTP 429 is always a rate limit
// - HTTP 403 is a rate limit when x-ratelimit-remaining is 0 (primary
//   limit) or when it carries retry-after (secondary limit); a 403 for
//   missing permissions has neither and is a plain failure
// =============================================================================

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{ExportError, Result};

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
const RETRY_AFTER: &str = "retry-after";

// Cheap to clone: reqwest's Client is reference counted internally
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
}

impl GitHubClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ExportError::MissingCredential)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("issue-archiver/", env!("CARGO_PKG_VERSION"))),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http })
    }

    // GET a URL and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        let response = check_response(response)?;
        decode(response).await
    }

    // POST a JSON body and decode the JSON reply.
    //
    // Also hands back the rate-limit reset time from the headers: GraphQL
    // reports rate limits inside a 200 response, and by then the headers
    // are the only place the reset time lives.
    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<(T, Option<DateTime<Utc>>)>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        let response = check_response(response)?;
        let reset_at = reset_time(response.headers());
        Ok((decode(response).await?, reset_at))
    }
}

// Turns a non-success response into the matching ExportError
fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if let Some(reset_at) = rate_limit_reset(status, response.headers(), Utc::now()) {
        return Err(ExportError::RateLimited { reset_at });
    }

    Err(ExportError::RequestFailed {
        status,
        url: response.url().to_string(),
    })
}

// Reads the whole body first so a decode failure is a serde error we can show
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

// Some(reset time) if this status + headers mean "rate limited"
pub fn rate_limit_reset(
    status: StatusCode,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let retry_after = header_str(headers, RETRY_AFTER)
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .map(|secs| now + chrono::Duration::seconds(secs));

    let exhausted = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (header_str(headers, RATE_LIMIT_REMAINING) == Some("0")
                || header_str(headers, RETRY_AFTER).is_some()));
    if !exhausted {
        return None;
    }

    // retry-after wins: on a secondary limit x-ratelimit-reset still points
    // at the primary window, which may be an hour away
    Some(retry_after.or_else(|| reset_time(headers)).unwrap_or(now))
}

// x-ratelimit-reset is a unix timestamp in seconds
pub fn reset_time(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    header_str(headers, RATE_LIMIT_RESET)
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

// How long to sleep before retrying: until the reset, but never less than `floor`
pub fn wait_duration(reset_at: DateTime<Utc>, now: DateTime<Utc>, floor: Duration) -> Duration {
    let until_reset = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
    until_reset.max(floor)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
