//! Twitter v1.1 REST API client
//!
//! Implements [`RemoteClient`] over the `friends/ids`, `followers/ids`,
//! `users/show` and `statuses/show` endpoints with app-only bearer auth.
//! ID listing follows cursors until exhausted; HTTP 429 responses are waited
//! out using the `x-rate-limit-reset` header.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{RelationshipList, RemoteClient, RemoteError};
use crate::data::{StatusRecord, UserId, UserRecord};

/// Base URL for the Twitter v1.1 API
const TWITTER_API_BASE_URL: &str = "https://api.twitter.com/1.1";

/// Maximum number of IDs returned per page by the `*/ids` endpoints
const IDS_PAGE_SIZE: u32 = 5000;

/// Wait used when a 429 response carries no usable reset header
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Upper bound on a single rate-limit wait (one API window)
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// Configuration for the Twitter client
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// App-only bearer token
    pub bearer_token: Option<String>,
    /// Base URL for the API (allows override for testing)
    pub base_url: String,
    /// How many rate-limit windows to wait out before giving up on a request
    pub max_rate_limit_waits: u32,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            base_url: TWITTER_API_BASE_URL.to_string(),
            max_rate_limit_waits: 3,
        }
    }
}

impl TwitterConfig {
    /// Creates a default config with the given bearer token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            ..Default::default()
        }
    }
}

/// One page of a cursored ID listing
#[derive(Debug, Deserialize)]
struct IdsPage {
    ids: Vec<UserId>,
    #[serde(default)]
    next_cursor: i64,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrors {
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Client for the Twitter v1.1 API
#[derive(Debug, Clone)]
pub struct TwitterClient {
    /// HTTP client for making requests
    http_client: Client,
    config: TwitterConfig,
}

impl TwitterClient {
    /// Creates a new TwitterClient with the given configuration
    pub fn new(config: TwitterConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a new TwitterClient with a custom HTTP client
    pub fn with_client(http_client: Client, config: TwitterConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Issues a GET request and decodes the JSON body
    ///
    /// `what` names the requested entity for `NotFound` errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, RemoteError> {
        let token = self
            .config
            .bearer_token
            .as_deref()
            .ok_or(RemoteError::MissingCredentials)?;
        let url = self.endpoint(path);
        let mut waits = 0;

        loop {
            debug!(url = %url, "remote request");
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if waits >= self.config.max_rate_limit_waits {
                    return Err(RemoteError::RateLimited);
                }
                waits += 1;
                let reset = response
                    .headers()
                    .get("x-rate-limit-reset")
                    .and_then(|v| v.to_str().ok());
                let wait = rate_limit_wait(reset, Utc::now());
                warn!(url = %url, wait_secs = wait.as_secs(), attempt = waits, "rate limited, waiting for reset");
                tokio::time::sleep(wait).await;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(RemoteError::NotFound(what.to_string()));
            }

            let body = response.text().await?;
            if !status.is_success() {
                return Err(RemoteError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&body),
                });
            }

            return serde_json::from_str(&body)
                .map_err(|e| RemoteError::MalformedResponse(format!("{}: {}", path, e)));
        }
    }
}

impl RemoteClient for TwitterClient {
    async fn list_relationship_ids(
        &self,
        username: &str,
        list: RelationshipList,
    ) -> Result<Vec<UserId>, RemoteError> {
        let path = match list {
            RelationshipList::Friends => "friends/ids.json",
            RelationshipList::Followers => "followers/ids.json",
        };
        let what = format!("{} of @{}", list, username);

        let mut ids = Vec::new();
        let mut cursor: i64 = -1;
        loop {
            let query = [
                ("screen_name", username.to_string()),
                ("cursor", cursor.to_string()),
                ("count", IDS_PAGE_SIZE.to_string()),
            ];
            let page: IdsPage = self.get_json(path, &query, &what).await?;
            debug!(list = %list, username, page_len = page.ids.len(), "fetched id page");
            ids.extend(page.ids);

            if page.next_cursor == 0 {
                break;
            }
            if page.next_cursor == cursor {
                return Err(RemoteError::MalformedResponse(format!(
                    "{} cursor did not advance past {}",
                    path, cursor
                )));
            }
            cursor = page.next_cursor;
        }
        Ok(ids)
    }

    async fn fetch_user_record(&self, id: UserId) -> Result<UserRecord, RemoteError> {
        let query = [("user_id", id.to_string())];
        self.get_json("users/show.json", &query, &format!("user {}", id))
            .await
    }

    async fn fetch_status(&self, id: u64) -> Result<StatusRecord, RemoteError> {
        let query = [("id", id.to_string()), ("tweet_mode", "extended".to_string())];
        self.get_json("statuses/show.json", &query, &format!("status {}", id))
            .await
    }
}

/// How long to sleep after a 429, given the `x-rate-limit-reset` epoch seconds
fn rate_limit_wait(reset_header: Option<&str>, now: DateTime<Utc>) -> Duration {
    let Some(reset) = reset_header.and_then(|v| v.trim().parse::<i64>().ok()) else {
        return DEFAULT_RATE_LIMIT_WAIT;
    };
    // One extra second so the request lands after the window resets
    let secs = reset.saturating_sub(now.timestamp()).saturating_add(1).max(1) as u64;
    Duration::from_secs(secs).min(MAX_RATE_LIMIT_WAIT)
}

/// Extracts a readable message from an API error body
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrors>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}
