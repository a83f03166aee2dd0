//! Firestore REST client.
//!
//! Uses the v1 `documents:runQuery` endpoint with a structured query so
//! the subject filter is evaluated server-side.

use super::{Document, DocumentStore, StoreError, StoreValue};
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Blocking Firestore client for a single project and database.
pub struct FirestoreClient {
    base_url: String,
    project_id: String,
    database: String,
    access_token: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl FirestoreClient {
    /// Create a client. `access_token` is sent as a bearer token when present.
    pub fn new(
        base_url: &str,
        project_id: &str,
        database: &str,
        access_token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        if project_id.is_empty() {
            return Err(StoreError::Config("project id is empty".to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            database: database.to_string(),
            access_token,
            client,
            timeout_secs,
        })
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents:runQuery",
            self.base_url, self.project_id, self.database
        )
    }

    fn run_query(&self, query: StructuredQuery<'_>) -> Result<Vec<Document>, StoreError> {
        let url = self.run_query_url();
        let body = RunQueryRequest {
            structured_query: query,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                StoreError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                StoreError::Timeout(self.timeout_secs)
            } else {
                StoreError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<RunQueryRow> = response
            .json()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let documents: Vec<Document> = rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(decode_document)
            .collect();

        debug!("runQuery returned {} documents", documents.len());
        Ok(documents)
    }
}

impl DocumentStore for FirestoreClient {
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        self.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: collection,
            }],
            filter: Some(Filter {
                field_filter: FieldFilter {
                    field: FieldReference { field_path: field },
                    op: "EQUAL",
                    value: StringValue {
                        string_value: value,
                    },
                },
            }),
        })
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: collection,
            }],
            filter: None,
        })
    }
}

/// Request body for `documents:runQuery`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest<'a> {
    structured_query: StructuredQuery<'a>,
}

#[derive(Serialize)]
struct StructuredQuery<'a> {
    from: Vec<CollectionSelector<'a>>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    filter: Option<Filter<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector<'a> {
    collection_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Filter<'a> {
    field_filter: FieldFilter<'a>,
}

#[derive(Serialize)]
struct FieldFilter<'a> {
    field: FieldReference<'a>,
    op: &'static str,
    value: StringValue<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference<'a> {
    field_path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StringValue<'a> {
    string_value: &'a str,
}

/// One element of the `runQuery` response stream.
#[derive(Deserialize)]
struct RunQueryRow {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

/// Typed Firestore value, e.g. `{"integerValue": "3"}`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
enum WireValue {
    NullValue(IgnoredAny),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(IgnoredAny),
    ReferenceValue(IgnoredAny),
    GeoPointValue(IgnoredAny),
    ArrayValue(IgnoredAny),
    MapValue(IgnoredAny),
}

fn decode_document(raw: RawDocument) -> Document {
    // name = projects/{p}/databases/{d}/documents/{collection}/{id}
    let id = raw
        .name
        .rsplit('/')
        .next()
        .unwrap_or(raw.name.as_str())
        .to_string();

    let fields = raw
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect();

    Document { id, fields }
}

/// Decode one typed value. Values that do not decode cleanly are kept as
/// opaque text rather than failing the whole document.
fn decode_value(raw: &serde_json::Value) -> StoreValue {
    let opaque = || StoreValue::Opaque(raw.to_string());

    let wire: WireValue = match serde_json::from_value(raw.clone()) {
        Ok(wire) => wire,
        Err(_) => return opaque(),
    };

    match wire {
        WireValue::NullValue(_) => StoreValue::Null,
        WireValue::BooleanValue(b) => StoreValue::Bool(b),
        WireValue::IntegerValue(s) => s
            .parse()
            .map(StoreValue::Integer)
            .unwrap_or_else(|_| opaque()),
        WireValue::DoubleValue(x) => StoreValue::Double(x),
        WireValue::TimestampValue(s) => DateTime::parse_from_rfc3339(&s)
            .map(|ts| StoreValue::Timestamp(ts.with_timezone(&Utc)))
            .unwrap_or_else(|_| opaque()),
        WireValue::StringValue(s) => StoreValue::String(s),
        WireValue::BytesValue(_)
        | WireValue::ReferenceValue(_)
        | WireValue::GeoPointValue(_)
        | WireValue::ArrayValue(_)
        | WireValue::MapValue(_) => opaque(),
    }
}
