//! Opaque records returned by the remote API
//!
//! Records are kept as raw attribute maps so that whatever the API returns is
//! cached unchanged. Only the few attributes the resolver needs are read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::UserId;

/// A user record: attribute name → value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Map<String, Value>);

impl UserRecord {
    /// Creates a minimal record with an `id` and a `screen_name`.
    pub fn new(id: UserId, handle: impl Into<String>) -> Self {
        let mut attributes = Map::new();
        attributes.insert("id".to_string(), Value::from(id));
        attributes.insert("id_str".to_string(), Value::from(id.to_string()));
        attributes.insert("screen_name".to_string(), Value::from(handle.into()));
        Self(attributes)
    }

    pub fn from_attributes(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The numeric ID, read from `id` or, failing that, `id_str`.
    pub fn id(&self) -> Option<UserId> {
        read_id(&self.0)
    }

    /// The human-readable handle (`screen_name`).
    pub fn handle(&self) -> Option<&str> {
        self.0.get("screen_name").and_then(Value::as_str)
    }
}

/// A status (post) record: attribute name → value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusRecord(Map<String, Value>);

impl StatusRecord {
    pub fn from_attributes(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn id(&self) -> Option<u64> {
        read_id(&self.0)
    }

    /// Status text, from `full_text` when present, else `text`.
    pub fn text(&self) -> Option<&str> {
        self.0
            .get("full_text")
            .or_else(|| self.0.get("text"))
            .and_then(Value::as_str)
    }
}

fn read_id(attributes: &Map<String, Value>) -> Option<u64> {
    attributes.get("id").and_then(Value::as_u64).or_else(|| {
        attributes
            .get("id_str")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    })
}
