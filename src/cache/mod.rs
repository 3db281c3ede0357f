//! Cache module for storing API responses to disk
//!
//! The cache root is split into named areas (users, relationship lists,
//! tweets and snapshots). Every entry is a JSON file whose age is taken from
//! the file's modification time, so staleness never depends on the payload.

mod config;
mod store;

pub use config::{CacheArea, CacheConfig};
pub use store::{CacheEntry, CacheError, CacheStore};
