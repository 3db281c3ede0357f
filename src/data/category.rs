//! Relationship categories and output formats

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four relationship categories of a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Accounts the subject follows
    Friends,
    /// Accounts that follow the subject
    Followers,
    /// Followers the subject does not follow back
    Fans,
    /// Followed accounts that do not follow back
    Stans,
}

impl Category {
    /// Returns a slice containing all categories.
    pub fn all() -> &'static [Category] {
        &[
            Category::Friends,
            Category::Followers,
            Category::Fans,
            Category::Stans,
        ]
    }

    /// Returns the lowercase name used in cache keys and snapshot fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Friends => "friends",
            Category::Followers => "followers",
            Category::Fans => "fans",
            Category::Stans => "stans",
        }
    }

    /// Fans and stans are computed from friends and followers, never fetched.
    pub fn is_derived(&self) -> bool {
        matches!(self, Category::Fans | Category::Stans)
    }

    /// Parses a category name, case-insensitively.
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_lowercase().as_str() {
            "friends" | "following" => Some(Category::Friends),
            "followers" => Some(Category::Followers),
            "fans" => Some(Category::Fans),
            "stans" => Some(Category::Stans),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a relationship mapping is presented to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The full ID → handle mapping
    #[default]
    Mapping,
    /// Handles only
    Handles,
    /// IDs only
    Ids,
}

impl OutputFormat {
    /// Parses an output format name.
    pub fn parse(s: &str) -> Option<OutputFormat> {
        match s.trim().to_lowercase().as_str() {
            "mapping" | "dict" => Some(OutputFormat::Mapping),
            "handles" | "screen_name" => Some(OutputFormat::Handles),
            "ids" | "id" => Some(OutputFormat::Ids),
            _ => None,
        }
    }
}
