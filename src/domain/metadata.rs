//! Metadata record model
//!
//! A metadata record is a flat mapping from [`Tag`] to a string value.
//! Records are owned by the caller; the engine never mutates its input and
//! always produces a fresh output record.

use crate::domain::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat `Tag -> value` metadata record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord(BTreeMap<Tag, String>);

impl MetadataRecord {
    /// Creates an empty record
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value for a tag, if present
    pub fn get(&self, tag: &Tag) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    /// Returns true if the tag is present
    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains_key(tag)
    }

    /// Inserts or replaces a value
    pub fn insert(&mut self, tag: Tag, value: impl Into<String>) -> Option<String> {
        self.0.insert(tag, value.into())
    }

    /// Removes a tag, returning its value if it was present
    pub fn remove(&mut self, tag: &Tag) -> Option<String> {
        self.0.remove(tag)
    }

    /// Iterates over `(tag, value)` pairs in tag order
    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &String)> {
        self.0.iter()
    }

    /// Number of tags in the record
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Tag, String)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (Tag, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
