//! Point-in-time snapshots of a subject's relationships
//!
//! A snapshot records the member IDs and counts of all four categories under
//! an integer timestamp key (seconds since the epoch). Snapshots are written
//! once and never modified; two snapshots can be compared with [`diff`].

mod differ;
mod manager;

pub use differ::{diff, CategoryDiff, SnapshotDiff};
pub use manager::SnapshotManager;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::cache::CacheError;
use crate::data::{Category, RelationshipMapping, UserId};
use crate::resolver::ResolveError;

/// Errors that can occur when capturing or loading snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// There are no snapshots to load or compare
    #[error("No snapshots available")]
    NoSnapshotsAvailable,

    /// There is no snapshot older than the given one to compare against
    #[error("No snapshot earlier than {0} to compare against")]
    NoEarlierSnapshot(SnapshotId),

    /// An explicit key does not resolve to a stored snapshot
    #[error("Snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),

    /// The stored payload is not a valid snapshot
    #[error("Corrupt snapshot {key}: {reason}")]
    CorruptSnapshot { key: SnapshotId, reason: String },

    /// A snapshot already exists under the capture timestamp
    #[error("A snapshot already exists for timestamp {0}")]
    Collision(SnapshotId),

    /// Resolving the relationships to capture failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Reading or writing the snapshot area failed
    #[error(transparent)]
    Storage(#[from] CacheError),
}

/// Snapshot key: creation time in whole seconds since the epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(i64);

impl SnapshotId {
    pub fn new(timestamp: i64) -> Self {
        Self(timestamp)
    }

    /// Truncates a point in time to whole seconds
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.timestamp())
    }

    pub fn timestamp(&self) -> i64 {
        self.0
    }

    /// The creation time encoded in the key
    pub fn created(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0, 0).single()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SnapshotId)
    }
}

/// The stored payload of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub username: String,
    pub friends: Vec<UserId>,
    pub followers: Vec<UserId>,
    pub fans: Vec<UserId>,
    pub stans: Vec<UserId>,
    pub friends_count: usize,
    pub followers_count: usize,
    pub fans_count: usize,
    pub stans_count: usize,
}

impl Snapshot {
    /// Builds a snapshot from fully-resolved mappings
    pub fn from_mappings(
        username: impl Into<String>,
        friends: &RelationshipMapping,
        followers: &RelationshipMapping,
        fans: &RelationshipMapping,
        stans: &RelationshipMapping,
    ) -> Self {
        Self {
            username: username.into(),
            friends: friends.ids(),
            followers: followers.ids(),
            fans: fans.ids(),
            stans: stans.ids(),
            friends_count: friends.len(),
            followers_count: followers.len(),
            fans_count: fans.len(),
            stans_count: stans.len(),
        }
    }

    pub fn ids(&self, category: Category) -> &[UserId] {
        match category {
            Category::Friends => &self.friends,
            Category::Followers => &self.followers,
            Category::Fans => &self.fans,
            Category::Stans => &self.stans,
        }
    }

    pub fn id_set(&self, category: Category) -> BTreeSet<UserId> {
        self.ids(category).iter().copied().collect()
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Friends => self.friends_count,
            Category::Followers => self.followers_count,
            Category::Fans => self.fans_count,
            Category::Stans => self.stans_count,
        }
    }

    /// Checks that every stored count matches its ID list
    fn validate(&self) -> Result<(), String> {
        for &category in Category::all() {
            let len = self.ids(category).len();
            let count = self.count(category);
            if len != count {
                return Err(format!(
                    "{}_count is {} but {} ids are stored",
                    category, count, len
                ));
            }
        }
        Ok(())
    }
}

/// Metadata computed when a snapshot is loaded; never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// Full path of the stored snapshot
    pub full_path: PathBuf,
    pub key: SnapshotId,
    /// Creation time decoded from the key
    pub created: DateTime<Utc>,
}

/// A snapshot together with its load-time metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSnapshot {
    pub snapshot: Snapshot,
    pub meta: SnapshotMeta,
}
