//! graphsnap library
//!
//! Cache-backed social graph resolution (friends, followers, fans, stans)
//! and timestamped snapshots that can be compared over time.

pub mod cache;
pub mod cli;
pub mod data;
pub mod remote;
pub mod resolver;
pub mod snapshot;

pub use cache::{CacheArea, CacheConfig, CacheError, CacheStore};
pub use data::{Category, OutputFormat, Projection, RelationshipMapping, UserId, UserRecord};
pub use remote::{RelationshipList, RemoteClient, RemoteError, TwitterClient, TwitterConfig};
pub use resolver::{derive_ids, RelationshipResolver, ResolveError, Thresholds};
pub use snapshot::{diff, Snapshot, SnapshotDiff, SnapshotError, SnapshotId, SnapshotManager};
