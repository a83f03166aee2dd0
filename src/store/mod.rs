//! Document store access.
//!
//! The pipeline only needs one capability from the store: read every
//! document of a collection, optionally filtered by an exact field match.
//! [`DocumentStore`] is that seam; [`FirestoreClient`] talks to the
//! Firestore REST API and [`MemoryStore`] serves snapshots and tests.

mod firestore;
mod memory;

pub use firestore::FirestoreClient;
pub use memory::MemoryStore;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Errors raised while reading from a document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot connect to document store at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Document store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    #[error("Store configuration error: {0}")]
    Config(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// A field value as the store hands it out, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// Store-native timestamp.
    Timestamp(DateTime<Utc>),
    /// Anything without a scalar counterpart (maps, arrays, references...),
    /// kept as compact JSON text.
    Opaque(String),
}

impl StoreValue {
    /// Timestamp-conversion capability: `Some` only for store-native timestamps.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            StoreValue::Timestamp(ts) => Some(ts.naive_utc()),
            _ => None,
        }
    }
}

/// A stored document: identifier plus fields in stored order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Vec<(String, StoreValue)>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field setter.
    pub fn field(mut self, key: impl Into<String>, value: StoreValue) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&StoreValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Read interface of a document store.
pub trait DocumentStore {
    /// Every document in `collection` whose `field` equals `value` exactly.
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError>;

    /// Every document in `collection`.
    fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;
}
