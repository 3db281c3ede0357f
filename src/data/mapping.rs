//! Relationship mappings (member ID → handle)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::{OutputFormat, UserId};

/// Members of one relationship category, keyed by ID
///
/// Serialized as a JSON object of `"id": "handle"` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipMapping(BTreeMap<UserId, String>);

impl RelationshipMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from `(id, handle)` pairs in fetch order.
    ///
    /// Duplicate IDs and duplicate handles are dropped; the first pair seen wins.
    pub fn from_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = (UserId, S)>,
        S: Into<String>,
    {
        let mut mapping = Self::new();
        let mut seen_handles = HashSet::new();
        for (id, handle) in members {
            let handle = handle.into();
            if mapping.0.contains_key(&id) || !seen_handles.insert(handle.clone()) {
                continue;
            }
            mapping.0.insert(id, handle);
        }
        mapping
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.0.contains_key(&id)
    }

    /// Returns the handle recorded for a member
    pub fn handle(&self, id: UserId) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    /// Member IDs in ascending order
    pub fn ids(&self) -> Vec<UserId> {
        self.0.keys().copied().collect()
    }

    pub fn id_set(&self) -> BTreeSet<UserId> {
        self.0.keys().copied().collect()
    }

    /// Member handles, ordered by ID
    pub fn handles(&self) -> Vec<String> {
        self.0.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserId, &str)> {
        self.0.iter().map(|(id, handle)| (*id, handle.as_str()))
    }

    /// Projects the mapping into the requested output format.
    pub fn project(&self, format: OutputFormat) -> Projection {
        match format {
            OutputFormat::Mapping => Projection::Mapping(self.0.clone()),
            OutputFormat::Handles => Projection::Handles(self.handles()),
            OutputFormat::Ids => Projection::Ids(self.ids()),
        }
    }
}

/// A relationship mapping rendered in one output format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Mapping(BTreeMap<UserId, String>),
    Handles(Vec<String>),
    Ids(Vec<UserId>),
}

impl Projection {
    pub fn len(&self) -> usize {
        match self {
            Projection::Mapping(map) => map.len(),
            Projection::Handles(handles) => handles.len(),
            Projection::Ids(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Projection {
    /// One member per line; mappings are tab-separated `id\thandle`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Mapping(map) => {
                for (id, handle) in map {
                    writeln!(f, "{}\t{}", id, handle)?;
                }
            }
            Projection::Handles(handles) => {
                for handle in handles {
                    writeln!(f, "{}", handle)?;
                }
            }
            Projection::Ids(ids) => {
                for id in ids {
                    writeln!(f, "{}", id)?;
                }
            }
        }
        Ok(())
    }
}
