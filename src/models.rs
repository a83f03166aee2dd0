//! Data models for the analytics pipeline.
//!
//! This module contains the core data structures shared by the fetcher,
//! the normalizer, the chart strategies and the orchestrator: scalar cell
//! values, fetched records, categories and the per-run analytics report.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A scalar field value of a fetched record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or explicit null.
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Plain timestamp (UTC, no store-specific wrapper).
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns true for the null cell.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One fetched document as a flat, ordered key-value record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing an existing value in place or appending a new key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Builder-style variant of [`Record::insert`].
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Store-assigned identifier.
    #[cfg(test)]
    pub fn id(&self) -> Option<&str> {
        match self.get(ID_FIELD) {
            Some(Value::Text(id)) => Some(id),
            _ => None,
        }
    }
}

/// Field under which the store-assigned document identifier is exposed.
pub const ID_FIELD: &str = "id";

/// A named grouping of homogeneous log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BowelMovement,
    Mood,
    Symptom,
    Meal,
}

impl Category {
    /// Stable key used in the analytics report.
    pub fn key(&self) -> &'static str {
        match self {
            Category::BowelMovement => "bowel-movement",
            Category::Mood => "mood",
            Category::Symptom => "symptom",
            Category::Meal => "meal",
        }
    }

    /// Name of the document collection holding this category.
    pub fn collection(&self) -> &'static str {
        match self {
            Category::BowelMovement => "stuhlgang",
            Category::Mood => "stimmung",
            Category::Symptom => "symptome",
            Category::Meal => "mahlzeit",
        }
    }

    /// Human-readable chart title.
    pub fn title(&self) -> &'static str {
        match self {
            Category::BowelMovement => "Stuhlgang",
            Category::Mood => "Stimmung",
            Category::Symptom => "Symptome",
            Category::Meal => "Mahlzeit",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Kind of chart a category is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Scatter,
    Line,
    Correlation,
    /// Registered but intentionally not charted.
    Skip,
}

impl ChartKind {
    /// Chart type as it appears in artifact file names.
    pub fn file_tag(&self) -> &'static str {
        match self {
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
            ChartKind::Correlation => "correlation",
            ChartKind::Skip => "skip",
        }
    }
}

/// Which records a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Records of a single subject, matched by exact equality.
    Subject(String),
    /// Every record of each category.
    Dataset,
}

impl Scope {
    /// Label used in chart titles and diagnostics.
    pub fn label(&self) -> &str {
        match self {
            Scope::Subject(id) => id,
            Scope::Dataset => "alle",
        }
    }

    /// Subject filter, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Scope::Subject(id) => Some(id),
            Scope::Dataset => None,
        }
    }

    /// Artifact file name: `<collection>_<charttype>_<subject>.png` or
    /// `<collection>_<charttype>.png` for the dataset variant.
    ///
    /// Path separators and other characters unsafe in file names are
    /// replaced, so the artifact always lands directly in the output dir.
    pub fn artifact_name(&self, category: Category, chart: ChartKind) -> String {
        match self {
            Scope::Subject(id) => format!(
                "{}_{}_{}.png",
                category.collection(),
                chart.file_tag(),
                file_safe(id)
            ),
            Scope::Dataset => format!("{}_{}.png", category.collection(), chart.file_tag()),
        }
    }
}

fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scope::Subject(id) => serializer.serialize_str(id),
            Scope::Dataset => serializer.serialize_none(),
        }
    }
}

/// Why a category produced no artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum AbsenceReason {
    NoEntries,
    NoTimeAxis,
    NoNumericField,
    MissingValueField(String),
    TooFewNumericFields,
    NoPlottableRows,
    IntentionallyExcluded,
    FetchFailed(String),
    RenderFailed(String),
}

impl fmt::Display for AbsenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsenceReason::NoEntries => write!(f, "no entries"),
            AbsenceReason::NoTimeAxis => write!(f, "no time axis"),
            AbsenceReason::NoNumericField => write!(f, "no numeric fields"),
            AbsenceReason::MissingValueField(_) => write!(f, "missing value field"),
            AbsenceReason::TooFewNumericFields => write!(f, "fewer than two numeric fields"),
            AbsenceReason::NoPlottableRows => write!(f, "no plottable rows"),
            AbsenceReason::IntentionallyExcluded => write!(f, "intentionally excluded"),
            AbsenceReason::FetchFailed(detail) => write!(f, "fetch failed: {}", detail),
            AbsenceReason::RenderFailed(detail) => write!(f, "render failed: {}", detail),
        }
    }
}

impl Serialize for AbsenceReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one category: an artifact or an explicit absence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Artifact { path: PathBuf },
    Absent { reason: AbsenceReason },
}

/// Result of processing one category in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResult {
    pub collection: &'static str,
    pub chart: ChartKind,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl CategoryResult {
    pub fn artifact(category: Category, chart: ChartKind, path: PathBuf) -> Self {
        Self {
            collection: category.collection(),
            chart,
            outcome: Outcome::Artifact { path },
        }
    }

    pub fn absent(category: Category, chart: ChartKind, reason: AbsenceReason) -> Self {
        Self {
            collection: category.collection(),
            chart,
            outcome: Outcome::Absent { reason },
        }
    }

    /// Path of the produced artifact, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            Outcome::Artifact { path } => Some(path),
            Outcome::Absent { .. } => None,
        }
    }

    /// Reason for the missing artifact, if any.
    #[cfg(test)]
    pub fn reason(&self) -> Option<&AbsenceReason> {
        match &self.outcome {
            Outcome::Artifact { .. } => None,
            Outcome::Absent { reason } => Some(reason),
        }
    }
}

/// The orchestrator's return value: one result per registered category.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    /// Subject the run covered (`null` for the dataset variant).
    pub scope: Scope,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Results keyed by category, in registry order.
    pub results: BTreeMap<Category, CategoryResult>,
}

impl AnalyticsReport {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            generated_at: Utc::now(),
            results: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn get(&self, category: Category) -> Option<&CategoryResult> {
        self.results.get(&category)
    }

    /// Number of categories that produced an artifact.
    pub fn artifact_count(&self) -> usize {
        self.results.values().filter(|r| r.path().is_some()).count()
    }
}
