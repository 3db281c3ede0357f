//! Core data models for graphsnap
//!
//! This module contains the types shared by the resolver and the snapshot
//! layer: relationship categories, member mappings and the opaque records
//! returned by the remote API.

pub mod category;
pub mod mapping;
pub mod record;

pub use category::{Category, OutputFormat};
pub use mapping::{Projection, RelationshipMapping};
pub use record::{StatusRecord, UserRecord};

/// Stable numeric identifier of an account
pub type UserId = u64;
