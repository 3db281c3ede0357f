//! Snapshot capture and retrieval

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{diff, LoadedSnapshot, Snapshot, SnapshotDiff, SnapshotError, SnapshotId, SnapshotMeta};
use crate::cache::{CacheArea, CacheError, CacheStore};
use crate::remote::RemoteClient;
use crate::resolver::RelationshipResolver;

/// Captures and loads snapshots stored in the cache's snapshot area
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    store: CacheStore,
}

impl SnapshotManager {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Captures the resolver's current state under the current time
    pub async fn capture<C: RemoteClient>(
        &self,
        resolver: &mut RelationshipResolver<C>,
        force: bool,
    ) -> Result<SnapshotId, SnapshotError> {
        self.capture_at(resolver, force, Utc::now()).await
    }

    /// Captures the resolver's current state under the given time
    ///
    /// The key is `at` truncated to whole seconds. Snapshots are never
    /// overwritten: a second capture within the same second fails with
    /// `SnapshotError::Collision`.
    pub async fn capture_at<C: RemoteClient>(
        &self,
        resolver: &mut RelationshipResolver<C>,
        force: bool,
        at: DateTime<Utc>,
    ) -> Result<SnapshotId, SnapshotError> {
        let key = SnapshotId::from_datetime(at);
        let storage_key = key.to_string();
        if self.store.exists(CacheArea::Snapshots, &storage_key) {
            return Err(SnapshotError::Collision(key));
        }

        // Forcing the primitives already invalidates the derived views
        let friends = resolver.friends(force).await?;
        let followers = resolver.followers(force).await?;
        let fans = resolver.fans(false).await?;
        let stans = resolver.stans(false).await?;

        let snapshot = Snapshot::from_mappings(
            resolver.username(),
            &friends,
            &followers,
            &fans,
            &stans,
        );

        // Resolution may have taken a while; check again right before writing
        if self.store.exists(CacheArea::Snapshots, &storage_key) {
            return Err(SnapshotError::Collision(key));
        }
        self.store
            .put(CacheArea::Snapshots, &storage_key, &snapshot)?;

        info!(
            key = %key,
            username = %snapshot.username,
            friends = snapshot.friends_count,
            followers = snapshot.followers_count,
            fans = snapshot.fans_count,
            stans = snapshot.stans_count,
            "snapshot captured"
        );
        Ok(key)
    }

    /// Lists stored snapshot keys in ascending order
    ///
    /// Entries whose name is not an integer timestamp are ignored.
    pub fn list(&self) -> Result<Vec<SnapshotId>, SnapshotError> {
        let mut keys: Vec<SnapshotId> = self
            .store
            .keys(CacheArea::Snapshots)?
            .into_iter()
            .filter_map(|name| match name.parse() {
                Ok(key) => Some(key),
                Err(_) => {
                    debug!(name = %name, "ignoring non-snapshot entry");
                    None
                }
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Returns the most recent snapshot key
    pub fn latest(&self) -> Result<SnapshotId, SnapshotError> {
        self.list()?
            .pop()
            .ok_or(SnapshotError::NoSnapshotsAvailable)
    }

    /// Loads a snapshot by key, or the most recent one when `key` is `None`
    pub fn load(&self, key: Option<SnapshotId>) -> Result<LoadedSnapshot, SnapshotError> {
        let key = match key {
            Some(key) => key,
            None => self.latest()?,
        };
        let storage_key = key.to_string();
        let full_path = self
            .store
            .entry_path(CacheArea::Snapshots, &storage_key)?;

        let snapshot = match self.store.get::<Snapshot>(CacheArea::Snapshots, &storage_key) {
            Ok(entry) => entry.payload,
            Err(CacheError::NotFound { .. }) => return Err(SnapshotError::SnapshotNotFound(key)),
            Err(CacheError::CorruptEntry { source, .. }) => {
                return Err(SnapshotError::CorruptSnapshot {
                    key,
                    reason: source.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        snapshot.validate().map_err(|reason| {
            warn!(key = %key, reason = %reason, "inconsistent snapshot");
            SnapshotError::CorruptSnapshot { key, reason }
        })?;

        let created = key.created().ok_or_else(|| SnapshotError::CorruptSnapshot {
            key,
            reason: "timestamp out of range".to_string(),
        })?;

        debug!(key = %key, path = %full_path.display(), "snapshot loaded");
        Ok(LoadedSnapshot {
            snapshot,
            meta: SnapshotMeta {
                full_path,
                key,
                created,
            },
        })
    }

    /// Loads two snapshots and compares them
    ///
    /// `to` defaults to the most recent snapshot and `from` to the one
    /// immediately before `to`.
    pub fn compare(
        &self,
        from: Option<SnapshotId>,
        to: Option<SnapshotId>,
    ) -> Result<(LoadedSnapshot, LoadedSnapshot, SnapshotDiff), SnapshotError> {
        let to = self.load(to)?;
        let from = match from {
            Some(key) => self.load(Some(key))?,
            None => {
                let previous = self
                    .list()?
                    .into_iter()
                    .filter(|key| *key < to.meta.key)
                    .last()
                    .ok_or(SnapshotError::NoEarlierSnapshot(to.meta.key))?;
                self.load(Some(previous))?
            }
        };

        if from.snapshot.username != to.snapshot.username {
            warn!(
                from = %from.snapshot.username,
                to = %to.snapshot.username,
                "comparing snapshots of different subjects"
            );
        }

        let result = diff(&from.snapshot, &to.snapshot);
        Ok((from, to, result))
    }
}
