//! End-to-end snapshot flow through the public library API
//!
//! Uses an in-memory remote whose relationship lists can be changed between
//! captures, and a temporary cache directory.

use chrono::{TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use tempfile::TempDir;

use graphsnap::data::StatusRecord;
use graphsnap::{
    diff, CacheStore, Category, RelationshipList, RelationshipResolver, RemoteClient, RemoteError,
    SnapshotId, SnapshotManager, UserId, UserRecord,
};

struct ScriptedRemote {
    friends: RefCell<Vec<UserId>>,
    followers: RefCell<Vec<UserId>>,
    list_calls: Cell<usize>,
}

impl ScriptedRemote {
    fn new(friends: &[UserId], followers: &[UserId]) -> Self {
        Self {
            friends: RefCell::new(friends.to_vec()),
            followers: RefCell::new(followers.to_vec()),
            list_calls: Cell::new(0),
        }
    }

    fn set(&self, friends: &[UserId], followers: &[UserId]) {
        *self.friends.borrow_mut() = friends.to_vec();
        *self.followers.borrow_mut() = followers.to_vec();
    }
}

impl RemoteClient for ScriptedRemote {
    async fn list_relationship_ids(
        &self,
        _username: &str,
        list: RelationshipList,
    ) -> Result<Vec<UserId>, RemoteError> {
        self.list_calls.set(self.list_calls.get() + 1);
        Ok(match list {
            RelationshipList::Friends => self.friends.borrow().clone(),
            RelationshipList::Followers => self.followers.borrow().clone(),
        })
    }

    async fn fetch_user_record(&self, id: UserId) -> Result<UserRecord, RemoteError> {
        Ok(UserRecord::new(id, format!("member{}", id)))
    }

    async fn fetch_status(&self, id: u64) -> Result<StatusRecord, RemoteError> {
        Err(RemoteError::NotFound(format!("status {}", id)))
    }
}

fn ids(values: &[UserId]) -> BTreeSet<UserId> {
    values.iter().copied().collect()
}

#[tokio::test]
async fn test_gain_friend_lose_follower_scenario() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = CacheStore::with_dir(dir.path());
    let manager = SnapshotManager::new(store.clone());
    let mut resolver =
        RelationshipResolver::new("subject", ScriptedRemote::new(&[1, 2, 3], &[2, 3, 4]), store)
            .unwrap();

    assert_eq!(resolver.fans(false).await.unwrap().id_set(), ids(&[4]));
    assert_eq!(resolver.stans(false).await.unwrap().id_set(), ids(&[1]));

    let t1 = manager
        .capture_at(&mut resolver, false, Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        .await
        .unwrap();

    resolver.client().set(&[1, 2, 3, 5], &[2, 3]);
    let t2 = manager
        .capture_at(&mut resolver, true, Utc.timestamp_opt(1_700_000_060, 0).unwrap())
        .await
        .unwrap();

    let second = manager.load(Some(t2)).unwrap().snapshot;
    assert_eq!(second.friends, vec![1, 2, 3, 5]);
    assert_eq!(second.followers, vec![2, 3]);
    assert!(second.fans.is_empty());
    assert_eq!(second.stans, vec![1, 5]);

    let first = manager.load(Some(t1)).unwrap().snapshot;
    let result = diff(&first, &second);

    assert_eq!(result.friends.gained, ids(&[5]));
    assert!(result.friends.lost.is_empty());
    assert!(result.followers.gained.is_empty());
    assert_eq!(result.followers.lost, ids(&[4]));
    assert!(result.fans.gained.is_empty());
    assert_eq!(result.fans.lost, ids(&[4]));
    assert_eq!(result.stans.gained, ids(&[5]));
    assert!(result.stans.lost.is_empty());

    for &category in Category::all() {
        let reverse = diff(&second, &first);
        assert_eq!(result.category(category).gained, reverse.category(category).lost);
    }
}

#[tokio::test]
async fn test_capture_without_force_uses_cached_lists() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::with_dir(dir.path());
    let manager = SnapshotManager::new(store.clone());
    let mut resolver =
        RelationshipResolver::new("subject", ScriptedRemote::new(&[1, 2], &[2, 3]), store).unwrap();

    let t1 = manager
        .capture_at(&mut resolver, false, Utc.timestamp_opt(100, 0).unwrap())
        .await
        .unwrap();
    resolver.client().set(&[9], &[9]);
    let t2 = manager
        .capture_at(&mut resolver, false, Utc.timestamp_opt(200, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(resolver.client().list_calls.get(), 2);
    let a = manager.load(Some(t1)).unwrap().snapshot;
    let b = manager.load(Some(t2)).unwrap().snapshot;
    assert!(diff(&a, &b).is_empty());
}

#[tokio::test]
async fn test_most_recent_snapshot_is_loaded_by_default() {
    let dir = TempDir::new().unwrap();
    let store = CacheStore::with_dir(dir.path());
    let manager = SnapshotManager::new(store.clone());
    let mut resolver =
        RelationshipResolver::new("subject", ScriptedRemote::new(&[1], &[1]), store).unwrap();

    for secs in [100, 200, 150] {
        manager
            .capture_at(&mut resolver, false, Utc.timestamp_opt(secs, 0).unwrap())
            .await
            .unwrap();
    }

    let latest = manager.load(None).unwrap();
    assert_eq!(latest.meta.key, SnapshotId::new(200));
    assert_eq!(latest.meta.created, Utc.timestamp_opt(200, 0).unwrap());
}

#[tokio::test]
async fn test_separate_cache_roots_are_isolated() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    let mut a = RelationshipResolver::new(
        "subject",
        ScriptedRemote::new(&[1], &[]),
        CacheStore::with_dir(dir_a.path()),
    )
    .unwrap();
    let mut b = RelationshipResolver::new(
        "subject",
        ScriptedRemote::new(&[2], &[]),
        CacheStore::with_dir(dir_b.path()),
    )
    .unwrap();

    assert_eq!(a.friends(false).await.unwrap().ids(), vec![1]);
    assert_eq!(b.friends(false).await.unwrap().ids(), vec![2]);
}
