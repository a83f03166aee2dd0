//! In-memory document store.
//!
//! Backs `--snapshot` runs against a local JSON export and serves as the
//! substitute client in tests.

use super::{Document, DocumentStore, StoreError, StoreValue};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

/// Key marking a store-native timestamp in snapshot files.
const TIMESTAMP_KEY: &str = "__timestamp";

/// Documents held in memory, grouped by collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to a collection.
    pub fn insert(&mut self, collection: &str, document: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Load a snapshot file.
    pub fn load_snapshot(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("cannot read snapshot {}: {}", path.display(), e))
        })?;
        Self::from_snapshot_json(&content)
    }

    /// Parse a snapshot: `{ "<collection>": [ { "id": "...", "<field>": ... } ] }`.
    pub fn from_snapshot_json(content: &str) -> Result<Self, StoreError> {
        let root: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|e| StoreError::Decode(e.to_string()))?;

        let mut store = Self::new();
        for (collection, entries) in root {
            let entries = entries.as_array().ok_or_else(|| {
                StoreError::Decode(format!("collection '{}' is not an array", collection))
            })?;

            for (index, entry) in entries.iter().enumerate() {
                let object = entry.as_object().ok_or_else(|| {
                    StoreError::Decode(format!(
                        "entry {} of '{}' is not an object",
                        index, collection
                    ))
                })?;

                let id = object
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .unwrap_or_else(|| format!("{}-{}", collection, index));

                let document = object
                    .iter()
                    .filter(|(k, _)| k.as_str() != "id")
                    .fold(Document::new(id), |doc, (key, value)| {
                        doc.field(key.clone(), snapshot_value(value))
                    });
                store.insert(&collection, document);
            }
        }

        Ok(store)
    }
}

fn snapshot_value(value: &serde_json::Value) -> StoreValue {
    use serde_json::Value as Json;

    match value {
        Json::Null => StoreValue::Null,
        Json::Bool(b) => StoreValue::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => StoreValue::Integer(i),
            None => n
                .as_f64()
                .map(StoreValue::Double)
                .unwrap_or_else(|| StoreValue::Opaque(n.to_string())),
        },
        Json::String(s) => StoreValue::String(s.clone()),
        Json::Object(map) if map.len() == 1 => {
            match map.get(TIMESTAMP_KEY).and_then(|v| v.as_str()) {
                Some(raw) => DateTime::parse_from_rfc3339(raw)
                    .map(|ts| StoreValue::Timestamp(ts.with_timezone(&Utc)))
                    .unwrap_or_else(|_| StoreValue::Opaque(value.to_string())),
                None => StoreValue::Opaque(value.to_string()),
            }
        }
        other => StoreValue::Opaque(other.to_string()),
    }
}

impl DocumentStore for MemoryStore {
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let matches = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| {
                        matches!(doc.get(field), Some(StoreValue::String(s)) if s == value)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SNAPSHOT: &str = r#"{
        "stuhlgang": [
            { "id": "a1", "userId": "Larissa", "zeitpunkt": { "__timestamp": "2024-05-01T10:00:00Z" }, "bristol": 4 },
            { "id": "a2", "userId": "larissa", "bristol": 5.5 },
            { "userId": "Tom", "tags": ["x"] }
        ],
        "stimmung": []
    }"#;

    #[test]
    fn test_snapshot_values() {
        let store = MemoryStore::from_snapshot_json(SNAPSHOT).unwrap();
        let docs = store.find_all("stuhlgang").unwrap();
        assert_eq!(docs.len(), 3);

        assert_eq!(docs[0].id, "a1");
        assert_eq!(
            docs[0].get("zeitpunkt"),
            Some(&StoreValue::Timestamp(
                Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            ))
        );
        assert_eq!(docs[0].get("bristol"), Some(&StoreValue::Integer(4)));
        assert!(docs[0].get("id").is_none());
        assert_eq!(docs[1].get("bristol"), Some(&StoreValue::Double(5.5)));
        assert_eq!(docs[2].id, "stuhlgang-2");
        assert!(matches!(docs[2].get("tags"), Some(StoreValue::Opaque(_))));
    }

    #[test]
    fn test_subject_filter_is_exact() {
        let store = MemoryStore::from_snapshot_json(SNAPSHOT).unwrap();
        let docs = store
            .find_by_field("stuhlgang", "userId", "Larissa")
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a1");

        assert!(store
            .find_by_field("stuhlgang", "userId", "Laris")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_collection_is_empty() {
        let store = MemoryStore::from_snapshot_json(SNAPSHOT).unwrap();
        assert!(store.find_all("mahlzeit").unwrap().is_empty());
        assert!(store
            .find_by_field("mahlzeit", "userId", "Larissa")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rejects_malformed_snapshot() {
        assert!(matches!(
            MemoryStore::from_snapshot_json(r#"{ "stuhlgang": {} }"#),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            MemoryStore::from_snapshot_json("not json"),
            Err(StoreError::Decode(_))
        ));
    }
}
