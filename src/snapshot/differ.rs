//! Pairwise snapshot comparison

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::Snapshot;
use crate::data::{Category, UserId};

/// Members gained and lost in one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryDiff {
    pub gained: BTreeSet<UserId>,
    pub lost: BTreeSet<UserId>,
}

impl CategoryDiff {
    pub fn is_empty(&self) -> bool {
        self.gained.is_empty() && self.lost.is_empty()
    }
}

/// Gained/lost members for all four categories, directional from `a` to `b`
///
/// Every category is always present; "no changes" is four empty diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    pub friends: CategoryDiff,
    pub followers: CategoryDiff,
    pub fans: CategoryDiff,
    pub stans: CategoryDiff,
}

impl SnapshotDiff {
    pub fn category(&self, category: Category) -> &CategoryDiff {
        match category {
            Category::Friends => &self.friends,
            Category::Followers => &self.followers,
            Category::Fans => &self.fans,
            Category::Stans => &self.stans,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryDiff {
        match category {
            Category::Friends => &mut self.friends,
            Category::Followers => &mut self.followers,
            Category::Fans => &mut self.fans,
            Category::Stans => &mut self.stans,
        }
    }

    /// True when no category gained or lost anyone
    pub fn is_empty(&self) -> bool {
        Category::all().iter().all(|c| self.category(*c).is_empty())
    }
}

impl SnapshotDiff {
    /// Writes the per-category summary, labelling each changed ID with the
    /// handle `label` returns for it
    pub fn write_labelled<W, F>(&self, out: &mut W, label: F) -> fmt::Result
    where
        W: fmt::Write,
        F: Fn(UserId) -> Option<String>,
    {
        for &category in Category::all() {
            let diff = self.category(category);
            writeln!(
                out,
                "{}: +{} -{}",
                category,
                diff.gained.len(),
                diff.lost.len()
            )?;
            let changes = diff
                .gained
                .iter()
                .map(|id| ('+', *id))
                .chain(diff.lost.iter().map(|id| ('-', *id)));
            for (sign, id) in changes {
                match label(id) {
                    Some(handle) => writeln!(out, "  {} {} @{}", sign, id, handle)?,
                    None => writeln!(out, "  {} {}", sign, id)?,
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for SnapshotDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_labelled(f, |_| None)
    }
}

/// Compares two snapshots: `lost = a − b` and `gained = b − a` per category.
pub fn diff(a: &Snapshot, b: &Snapshot) -> SnapshotDiff {
    let mut result = SnapshotDiff::default();
    for &category in Category::all() {
        let before = a.id_set(category);
        let after = b.id_set(category);
        let entry = result.category_mut(category);
        entry.lost = before.difference(&after).copied().collect();
        entry.gained = after.difference(&before).copied().collect();
    }
    result
}
