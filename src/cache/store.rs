//! Cache store for persisting records to disk
//!
//! Provides a `CacheStore` that keeps JSON payloads under `(area, key)` pairs.
//! An entry's creation time is its file modification time; staleness is a
//! comparison of that age against a threshold in days.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::config::{CacheArea, CacheConfig};

/// Errors that can occur when reading or writing the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry exists for the key
    #[error("No cache entry for {area}/{key}")]
    NotFound { area: CacheArea, key: String },

    /// The entry exists but its payload is not valid JSON of the expected shape
    #[error("Corrupt cache entry {}: {source}", path.display())]
    CorruptEntry {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The cache location cannot be created, read or written
    #[error("Cache storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The key cannot be mapped to a path inside the cache area
    #[error("Invalid cache key: '{0}'")]
    InvalidKey(String),
}

/// A payload read back from the cache, with its age at read time
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub payload: T,
    /// When the entry was written (file modification time)
    pub created_at: DateTime<Utc>,
    /// Wall-clock age of the entry, never negative
    pub age: Duration,
}

/// Reads and writes cache entries on disk
///
/// Every method touches the filesystem; nothing is kept in memory between calls.
#[derive(Debug, Clone)]
pub struct CacheStore {
    config: CacheConfig,
}

impl CacheStore {
    /// Creates a store over the given cache configuration
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// Creates a store rooted at a custom directory
    pub fn with_dir(root: impl AsRef<Path>) -> Self {
        Self::new(CacheConfig::with_root(root))
    }

    /// Returns the configuration this store was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the path of the file backing `(area, key)`
    ///
    /// Keys may contain `/` to nest entries (relationship lists are scoped
    /// per subject), but every segment must be a plain file name.
    pub fn entry_path(&self, area: CacheArea, key: &str) -> Result<PathBuf, CacheError> {
        let segments: Vec<&str> = key.split('/').collect();
        let invalid = |segment: &&str| {
            segment.is_empty()
                || *segment == "."
                || *segment == ".."
                || segment.contains('\\')
                || segment.contains('\0')
        };
        if segments.iter().any(invalid) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }

        let mut path = self.config.area_dir(area);
        let (file, dirs) = segments
            .split_last()
            .ok_or_else(|| CacheError::InvalidKey(key.to_string()))?;
        path.extend(dirs);
        path.push(format!("{}.json", file));
        Ok(path)
    }

    /// Returns true if an entry exists for the key
    pub fn exists(&self, area: CacheArea, key: &str) -> bool {
        self.entry_path(area, key)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Returns the creation time of an entry
    pub fn created_at(&self, area: CacheArea, key: &str) -> Result<DateTime<Utc>, CacheError> {
        let path = self.entry_path(area, key)?;
        let metadata = fs::metadata(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CacheError::NotFound {
                    area,
                    key: key.to_string(),
                }
            } else {
                CacheError::StorageUnavailable {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let modified = metadata
            .modified()
            .map_err(|source| CacheError::StorageUnavailable { path, source })?;
        Ok(DateTime::<Utc>::from(modified))
    }

    /// Reads an entry
    ///
    /// # Returns
    /// * `Ok(CacheEntry<T>)` if the entry exists and parses
    /// * `Err(CacheError::NotFound)` if there is no entry
    /// * `Err(CacheError::CorruptEntry)` if the payload cannot be parsed
    pub fn get<T: DeserializeOwned>(
        &self,
        area: CacheArea,
        key: &str,
    ) -> Result<CacheEntry<T>, CacheError> {
        let path = self.entry_path(area, key)?;
        let created_at = self.created_at(area, key)?;
        let content = fs::read_to_string(&path).map_err(|source| {
            CacheError::StorageUnavailable {
                path: path.clone(),
                source,
            }
        })?;
        let payload = serde_json::from_str(&content).map_err(|source| {
            warn!(path = %path.display(), error = %source, "corrupt cache entry");
            CacheError::CorruptEntry { path, source }
        })?;

        Ok(CacheEntry {
            payload,
            created_at,
            age: age_since(created_at),
        })
    }

    /// Writes an entry, replacing any previous one
    ///
    /// The payload is written to a temporary sibling file and renamed into
    /// place, so a reader never observes a half-written entry.
    pub fn put<T: Serialize + ?Sized>(
        &self,
        area: CacheArea,
        key: &str,
        payload: &T,
    ) -> Result<(), CacheError> {
        let path = self.entry_path(area, key)?;
        let json = serde_json::to_vec_pretty(payload).map_err(|source| {
            CacheError::StorageUnavailable {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, source),
            }
        })?;

        write_atomic(&path, &json).map_err(|source| CacheError::StorageUnavailable {
            path: path.clone(),
            source,
        })?;

        debug!(area = %area, key, bytes = json.len(), "cache entry written");
        Ok(())
    }

    /// Returns true if the entry should be refreshed
    ///
    /// A missing entry is always stale. A negative threshold means an existing
    /// entry is never stale; otherwise the entry is stale once its age reaches
    /// `threshold_days` (so a threshold of 0 is stale as soon as it is written).
    /// A threshold too large to represent never expires.
    pub fn is_stale(&self, area: CacheArea, key: &str, threshold_days: i64) -> bool {
        let created_at = match self.created_at(area, key) {
            Ok(created_at) => created_at,
            Err(CacheError::NotFound { .. }) => return true,
            Err(e) => {
                debug!(area = %area, key, error = %e, "treating unreadable entry as stale");
                return true;
            }
        };
        if threshold_days < 0 {
            return false;
        }
        match Duration::try_days(threshold_days) {
            Some(threshold) => age_since(created_at) >= threshold,
            None => false,
        }
    }

    /// Lists the keys stored directly under an area, in no particular order
    pub fn keys(&self, area: CacheArea) -> Result<Vec<String>, CacheError> {
        let dir = self.config.area_dir(area);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(CacheError::StorageUnavailable { path: dir, source }),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::StorageUnavailable {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }

    /// Removes every entry in an area and returns how many were deleted
    pub fn purge(&self, area: CacheArea) -> Result<usize, CacheError> {
        let dir = self.config.area_dir(area);
        if !dir.is_dir() {
            return Ok(0);
        }
        let removed = count_files(&dir)
            .map_err(|source| CacheError::StorageUnavailable {
                path: dir.clone(),
                source,
            })?;
        fs::remove_dir_all(&dir).map_err(|source| CacheError::StorageUnavailable {
            path: dir.clone(),
            source,
        })?;
        debug!(area = %area, removed, "cache area purged");
        Ok(removed)
    }
}

/// Age of an entry relative to now, clamped at zero
fn age_since(created_at: DateTime<Utc>) -> Duration {
    let age = Utc::now() - created_at;
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)
}

fn count_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            count += count_files(&path)?;
        } else {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::time::{Duration as StdDuration, SystemTime};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_dir(temp_dir.path());
        (store, temp_dir)
    }

    fn sample(name: &str, value: i32) -> TestData {
        TestData {
            name: name.to_string(),
            value,
        }
    }

    /// Backdates an entry's modification time by a number of hours
    fn backdate(store: &CacheStore, area: CacheArea, key: &str, hours: u64) {
        let path = store.entry_path(area, key).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - StdDuration::from_secs(hours * 3600))
            .unwrap();
    }

    #[test]
    fn test_put_creates_file_in_area_directory() {
        let (store, temp_dir) = create_test_store();

        store
            .put(CacheArea::Users, "42", &sample("test", 42))
            .expect("Write should succeed");

        let expected_path = temp_dir.path().join("users").join("42.json");
        assert!(expected_path.exists(), "Cache file should exist");
        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"name\""));
        assert!(content.contains("\"test\""));
        assert!(!expected_path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_get_missing_key_is_not_found() {
        let (store, _temp_dir) = create_test_store();

        let result = store.get::<TestData>(CacheArea::Users, "nonexistent");

        assert!(matches!(result, Err(CacheError::NotFound { .. })));
        assert!(!store.exists(CacheArea::Users, "nonexistent"));
    }

    #[test]
    fn test_get_malformed_payload_is_corrupt_entry() {
        let (store, temp_dir) = create_test_store();
        let dir = temp_dir.path().join("users");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("7.json"), "{ not json").unwrap();

        let result = store.get::<TestData>(CacheArea::Users, "7");

        assert!(matches!(result, Err(CacheError::CorruptEntry { .. })));
    }

    #[test]
    fn test_get_wrong_shape_is_corrupt_entry() {
        let (store, _temp_dir) = create_test_store();
        store.put(CacheArea::Users, "7", &vec![1, 2, 3]).unwrap();

        let result = store.get::<TestData>(CacheArea::Users, "7");

        assert!(matches!(result, Err(CacheError::CorruptEntry { .. })));
    }

    #[test]
    fn test_roundtrip_reports_fresh_age() {
        let (store, _temp_dir) = create_test_store();
        let before = Utc::now() - Duration::seconds(2);

        store.put(CacheArea::Tweets, "99", &sample("roundtrip", 12345)).unwrap();
        let entry = store.get::<TestData>(CacheArea::Tweets, "99").unwrap();

        assert_eq!(entry.payload, sample("roundtrip", 12345));
        assert!(entry.created_at >= before);
        assert!(entry.age < Duration::minutes(1));
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let (store, _temp_dir) = create_test_store();

        store.put(CacheArea::Users, "1", &sample("first", 1)).unwrap();
        store.put(CacheArea::Users, "1", &sample("second", 2)).unwrap();

        let entry = store.get::<TestData>(CacheArea::Users, "1").unwrap();
        assert_eq!(entry.payload, sample("second", 2));
    }

    #[test]
    fn test_put_creates_nested_subject_directory() {
        let (store, temp_dir) = create_test_store();

        store
            .put(CacheArea::Lists, "alice/friends", &sample("nested", 1))
            .unwrap();

        assert!(temp_dir
            .path()
            .join("lists")
            .join("alice")
            .join("friends.json")
            .exists());
    }

    #[test]
    fn test_put_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = CacheStore::with_dir(&blocker);

        let result = store.put(CacheArea::Users, "1", &sample("x", 1));

        assert!(matches!(result, Err(CacheError::StorageUnavailable { .. })));
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        let (store, _temp_dir) = create_test_store();
        for key in ["", "../escape", "a//b", "a/./b", "a\\b"] {
            assert!(
                matches!(store.entry_path(CacheArea::Lists, key), Err(CacheError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_missing_entry_is_always_stale() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.is_stale(CacheArea::Users, "missing", -1));
        assert!(store.is_stale(CacheArea::Users, "missing", 0));
        assert!(store.is_stale(CacheArea::Users, "missing", 30));
    }

    #[test]
    fn test_negative_threshold_is_never_stale() {
        let (store, _temp_dir) = create_test_store();
        store.put(CacheArea::Users, "1", &sample("old", 1)).unwrap();
        backdate(&store, CacheArea::Users, "1", 24 * 3650);

        assert!(!store.is_stale(CacheArea::Users, "1", -1));
    }

    #[test]
    fn test_zero_threshold_is_stale_immediately() {
        let (store, _temp_dir) = create_test_store();
        store.put(CacheArea::Users, "1", &sample("new", 1)).unwrap();

        assert!(store.is_stale(CacheArea::Users, "1", 0));
    }

    #[test]
    fn test_positive_threshold_compares_age_in_days() {
        let (store, _temp_dir) = create_test_store();
        store.put(CacheArea::Lists, "alice/friends", &sample("a", 1)).unwrap();

        assert!(!store.is_stale(CacheArea::Lists, "alice/friends", 1));

        backdate(&store, CacheArea::Lists, "alice/friends", 23);
        assert!(!store.is_stale(CacheArea::Lists, "alice/friends", 1));

        backdate(&store, CacheArea::Lists, "alice/friends", 25);
        assert!(store.is_stale(CacheArea::Lists, "alice/friends", 1));
        assert!(!store.is_stale(CacheArea::Lists, "alice/friends", 2));
    }

    #[test]
    fn test_huge_threshold_is_never_stale() {
        let (store, _temp_dir) = create_test_store();
        store.put(CacheArea::Users, "1", &sample("a", 1)).unwrap();
        backdate(&store, CacheArea::Users, "1", 24 * 365);

        assert!(!store.is_stale(CacheArea::Users, "1", 200_000_000_000_000));
        assert!(!store.is_stale(CacheArea::Users, "1", i64::MAX));
        assert!(store.is_stale(CacheArea::Users, "missing", i64::MAX));
    }

    #[test]
    fn test_keys_lists_top_level_entries() {
        let (store, temp_dir) = create_test_store();
        store.put(CacheArea::Snapshots, "100", &sample("a", 1)).unwrap();
        store.put(CacheArea::Snapshots, "200", &sample("b", 2)).unwrap();
        fs::write(temp_dir.path().join("snapshots").join(".DS_Store"), "x").unwrap();

        let mut keys = store.keys(CacheArea::Snapshots).unwrap();
        keys.sort();

        assert_eq!(keys, vec!["100".to_string(), "200".to_string()]);
        assert!(store.keys(CacheArea::Tweets).unwrap().is_empty());
    }

    #[test]
    fn test_purge_removes_only_the_given_area() {
        let (store, _temp_dir) = create_test_store();
        store.put(CacheArea::Users, "1", &sample("a", 1)).unwrap();
        store.put(CacheArea::Users, "2", &sample("b", 2)).unwrap();
        store.put(CacheArea::Lists, "alice/friends", &sample("c", 3)).unwrap();

        assert_eq!(store.purge(CacheArea::Users).unwrap(), 2);

        assert!(!store.exists(CacheArea::Users, "1"));
        assert!(store.exists(CacheArea::Lists, "alice/friends"));
        assert_eq!(store.purge(CacheArea::Users).unwrap(), 0);
    }
}
