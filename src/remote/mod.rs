//! Remote social-graph API boundary
//!
//! The resolver only depends on the [`RemoteClient`] trait. Pagination,
//! authentication headers and rate-limit waiting are the concern of the
//! implementation ([`TwitterClient`] for the real API, in-memory fakes in tests).

mod twitter;

pub use twitter::{TwitterClient, TwitterConfig};

use std::fmt;
use thiserror::Error;

use crate::data::{StatusRecord, UserId, UserRecord};

/// Errors that can occur when talking to the remote API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The requested user or status does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit still exhausted after waiting the configured number of windows
    #[error("Rate limit exhausted")]
    RateLimited,

    /// Failed to parse API response
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    /// No credentials were configured
    #[error("No bearer token configured")]
    MissingCredentials,
}

/// The two primitive relationship lists the remote API can enumerate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipList {
    /// IDs the subject follows
    Friends,
    /// IDs that follow the subject
    Followers,
}

impl fmt::Display for RelationshipList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipList::Friends => f.write_str("friends"),
            RelationshipList::Followers => f.write_str("followers"),
        }
    }
}

/// Capabilities consumed from the remote social-graph service
///
/// Calls are awaited one at a time by the resolver. Implementations own any
/// retry, pagination or timeout policy.
#[allow(async_fn_in_trait)]
pub trait RemoteClient {
    /// Lists the IDs in one of the subject's relationship lists, in API order.
    async fn list_relationship_ids(
        &self,
        username: &str,
        list: RelationshipList,
    ) -> Result<Vec<UserId>, RemoteError>;

    /// Fetches a single user record by ID.
    async fn fetch_user_record(&self, id: UserId) -> Result<UserRecord, RemoteError>;

    /// Fetches a single status record by ID.
    async fn fetch_status(&self, id: u64) -> Result<StatusRecord, RemoteError>;
}
