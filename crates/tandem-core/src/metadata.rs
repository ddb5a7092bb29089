//! The versioned metadata map.
//!
//! Free-form metadata on sessions, messages, and context items is an
//! explicit key-value map with a version tag rather than an opaque JSON
//! blob. The minimal contract: keys are strings, values are arbitrary
//! JSON, serialization is key-ordered so equal maps produce equal JSON —
//! and therefore equal content hashes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current metadata schema version.
pub const METADATA_VERSION: u32 = 1;

/// Versioned key-value metadata.
///
/// Backed by a `BTreeMap` so `to_json()` is canonical: two maps with the
/// same entries serialize identically regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Schema version of this map.
    #[serde(default = "default_version")]
    pub version: u32,
    /// The entries.
    #[serde(default)]
    pub entries: BTreeMap<String, Value>,
}

fn default_version() -> u32 {
    METADATA_VERSION
}

impl Metadata {
    /// Empty map at the current version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: METADATA_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Builder: set one entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        let _ = self.entries.insert(key.into(), value);
        self
    }

    /// Insert an entry, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical JSON form (key-ordered).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from stored JSON. Missing fields default (version, entries).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::content_hash;
    use serde_json::json;

    #[test]
    fn canonical_serialization_is_order_independent() {
        let a = Metadata::new()
            .with("zebra", json!(1))
            .with("alpha", json!(2));
        let b = Metadata::new()
            .with("alpha", json!(2))
            .with("zebra", json!(1));
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn round_trips_through_content_hash() {
        let meta = Metadata::new().with("branch", json!("main"));
        let json = meta.to_json().unwrap();
        let reparsed = Metadata::from_json(&json).unwrap();
        assert_eq!(content_hash(&json), content_hash(&reparsed.to_json().unwrap()));
        assert_eq!(reparsed, meta);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let meta = Metadata::from_json("{}").unwrap();
        assert_eq!(meta.version, METADATA_VERSION);
        assert!(meta.is_empty());
    }

    #[test]
    fn insert_and_get() {
        let mut meta = Metadata::new();
        assert!(meta.insert("k", json!("v")).is_none());
        assert_eq!(meta.get("k"), Some(&json!("v")));
        assert_eq!(meta.insert("k", json!("w")), Some(json!("v")));
    }
}
