//! Insertion-ordered set of paths.

use std::ops::Index;

use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};

use crate::path::DepPath;

/// An append-only list of distinct paths that keeps insertion order.
///
/// Dependency sets are reported in discovery order, so this is used in
/// place of a sorted set. Membership checks go through a hash set; the
/// paths are stored twice to keep lookups allocation-free.
#[derive(Debug, Clone, Default)]
pub struct DepList {
    items: Vec<DepPath>,
    seen: FxHashSet<DepPath>,
}

impl DepList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless it is already present. Returns `true` if added.
    pub fn insert(&mut self, item: impl Into<DepPath>) -> bool {
        let item = item.into();
        if self.seen.contains(&item) {
            return false;
        }
        self.seen.insert(item.clone());
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: impl AsRef<[u8]>) -> bool {
        self.seen.contains(item.as_ref())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DepPath> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DepPath> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<DepPath> {
        self.items
    }
}

impl Index<usize> for DepList {
    type Output = DepPath;

    fn index(&self, index: usize) -> &DepPath {
        &self.items[index]
    }
}

impl<S: Into<DepPath>> FromIterator<S> for DepList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = DepList::new();
        list.extend(iter);
        list
    }
}

impl<S: Into<DepPath>> Extend<S> for DepList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl Serialize for DepList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}
