//! Cache location configuration

use directories::ProjectDirs;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Named partitions of the cache root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheArea {
    /// Per-user records, keyed by numeric user ID
    Users,
    /// Relationship mappings, keyed by `<subject>/<category>`
    Lists,
    /// Per-status records, keyed by numeric status ID
    Tweets,
    /// Timestamp-keyed snapshots
    Snapshots,
}

impl CacheArea {
    /// All areas in declaration order
    pub const ALL: [CacheArea; 4] = [
        CacheArea::Users,
        CacheArea::Lists,
        CacheArea::Tweets,
        CacheArea::Snapshots,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheArea::Users => "users",
            CacheArea::Lists => "lists",
            CacheArea::Tweets => "tweets",
            CacheArea::Snapshots => "snapshots",
        }
    }
}

impl fmt::Display for CacheArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheArea::ALL
            .into_iter()
            .find(|area| area.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

/// Where the cache lives on disk
///
/// Each resolver owns its own configuration, so separate subjects (or tests)
/// can point at separate roots without sharing any global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory of the cache
    pub root: PathBuf,
    /// Subdirectory for user records
    pub users_dir: String,
    /// Subdirectory for relationship mappings
    pub lists_dir: String,
    /// Subdirectory for status records
    pub tweets_dir: String,
    /// Subdirectory for snapshots
    pub snapshots_dir: String,
}

impl CacheConfig {
    /// Creates a config rooted at the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/graphsnap/` on Linux, or the equivalent on other platforms.
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "graphsnap")?;
        Some(Self::with_root(project_dirs.cache_dir()))
    }

    /// Creates a config rooted at a custom directory
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            users_dir: CacheArea::Users.as_str().to_string(),
            lists_dir: CacheArea::Lists.as_str().to_string(),
            tweets_dir: CacheArea::Tweets.as_str().to_string(),
            snapshots_dir: CacheArea::Snapshots.as_str().to_string(),
        }
    }

    /// Returns the directory backing an area
    pub fn area_dir(&self, area: CacheArea) -> PathBuf {
        let sub = match area {
            CacheArea::Users => &self.users_dir,
            CacheArea::Lists => &self.lists_dir,
            CacheArea::Tweets => &self.tweets_dir,
            CacheArea::Snapshots => &self.snapshots_dir,
        };
        self.root.join(sub)
    }
}
