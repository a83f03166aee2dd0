//! Record fetching.
//!
//! Turns stored documents of one category into flat [`Record`]s: typed
//! store values become plain scalars, detected timestamps become plain
//! timestamps, and the store-assigned identifier is exposed as `id`.

mod timestamps;

pub use timestamps::DetectorChain;

use crate::models::{Record, Scope, Value, ID_FIELD};
use crate::store::{Document, DocumentStore, StoreError, StoreValue};
use tracing::debug;

/// Fetches the records of one category, optionally for one subject.
pub struct RecordFetcher<'a> {
    store: &'a dyn DocumentStore,
    subject_field: String,
    detectors: DetectorChain,
}

impl<'a> RecordFetcher<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        subject_field: &str,
        detectors: DetectorChain,
    ) -> Self {
        Self {
            store,
            subject_field: subject_field.to_string(),
            detectors,
        }
    }

    /// Fetch every record of `collection` within `scope`.
    ///
    /// No matching documents is an empty vector, not an error.
    pub fn fetch(&self, collection: &str, scope: &Scope) -> Result<Vec<Record>, StoreError> {
        if collection.is_empty() {
            return Err(StoreError::InvalidQuery("collection name is empty".to_string()));
        }

        let documents = match scope.subject() {
            Some("") => {
                return Err(StoreError::InvalidQuery("subject is empty".to_string()));
            }
            Some(subject) => self
                .store
                .find_by_field(collection, &self.subject_field, subject)?,
            None => self.store.find_all(collection)?,
        };

        debug!(
            "Fetched {} documents from '{}' for {}",
            documents.len(),
            collection,
            scope.label()
        );

        Ok(documents.iter().map(|doc| self.to_record(doc)).collect())
    }

    fn to_record(&self, document: &Document) -> Record {
        document
            .fields
            .iter()
            .fold(Record::new(), |record, (key, value)| {
                let cell = match self.detectors.detect(key, value) {
                    Some(ts) => Value::Timestamp(ts),
                    None => plain_value(value),
                };
                record.with(key.as_str(), cell)
            })
            .with(ID_FIELD, Value::Text(document.id.clone()))
    }
}

/// Scalar conversion for fields no detector claimed. Timestamps that slip
/// through are kept as RFC 3339 text.
fn plain_value(value: &StoreValue) -> Value {
    match value {
        StoreValue::Null => Value::Null,
        StoreValue::Bool(b) => Value::Bool(*b),
        StoreValue::Integer(i) => Value::Integer(*i),
        StoreValue::Double(x) => Value::Float(*x),
        StoreValue::String(s) => Value::Text(s.clone()),
        StoreValue::Timestamp(ts) => Value::Text(ts.to_rfc3339()),
        StoreValue::Opaque(raw) => Value::Text(raw.clone()),
    }
}
