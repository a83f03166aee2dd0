//! Timestamp detection for fetched fields.
//!
//! Two heuristics decide whether a stored field holds a point in time:
//! probing the value for the store's timestamp-conversion capability, and
//! matching the field name against the time-axis naming convention. Both
//! are legitimate; deployments pick which ones run and in what order.
//! The first detector that recognizes a field wins.

use crate::config::DetectorKind;
use crate::models::Value;
use crate::store::StoreValue;
use crate::table::{is_time_column, parse_timestamp, parse_timestamp_str};
use chrono::NaiveDateTime;

/// Recognizes timestamp-valued fields.
pub trait TimestampDetector {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// The plain timestamp held by `value`, if this detector recognizes it.
    fn detect(&self, field: &str, value: &StoreValue) -> Option<NaiveDateTime>;
}

/// Recognizes values exposing the store's timestamp conversion.
pub struct CapabilityProbe;

impl TimestampDetector for CapabilityProbe {
    fn name(&self) -> &'static str {
        "capability"
    }

    fn detect(&self, _field: &str, value: &StoreValue) -> Option<NaiveDateTime> {
        value.to_datetime()
    }
}

/// Recognizes fields whose name contains the time token and whose value
/// parses as a timestamp.
pub struct FieldNameHeuristic {
    token: String,
}

impl FieldNameHeuristic {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

impl TimestampDetector for FieldNameHeuristic {
    fn name(&self) -> &'static str {
        "field-name"
    }

    fn detect(&self, field: &str, value: &StoreValue) -> Option<NaiveDateTime> {
        if !is_time_column(field, &self.token) {
            return None;
        }

        match value {
            StoreValue::Timestamp(ts) => Some(ts.naive_utc()),
            StoreValue::String(s) => parse_timestamp_str(s),
            StoreValue::Integer(i) => parse_timestamp(&Value::Integer(*i)),
            StoreValue::Double(x) => parse_timestamp(&Value::Float(*x)),
            _ => None,
        }
    }
}

/// Ranked list of detectors; the first match wins.
pub struct DetectorChain {
    detectors: Vec<Box<dyn TimestampDetector>>,
}

impl DetectorChain {
    pub fn new(detectors: Vec<Box<dyn TimestampDetector>>) -> Self {
        Self { detectors }
    }

    /// Build a chain from configured detector kinds, keeping their order.
    pub fn from_kinds(kinds: &[DetectorKind], time_token: &str) -> Self {
        let detectors = kinds
            .iter()
            .map(|kind| -> Box<dyn TimestampDetector> {
                match kind {
                    DetectorKind::Capability => Box::new(CapabilityProbe),
                    DetectorKind::FieldName => Box::new(FieldNameHeuristic::new(time_token)),
                }
            })
            .collect();
        Self::new(detectors)
    }

    /// Names of the configured detectors, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn detect(&self, field: &str, value: &StoreValue) -> Option<NaiveDateTime> {
        self.detectors
            .iter()
            .find_map(|detector| detector.detect(field, value))
    }
}
