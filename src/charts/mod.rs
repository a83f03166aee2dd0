//! Chart strategies.
//!
//! Each strategy consumes a normalized [`Table`] and either writes one
//! image artifact or declines with an [`AbsenceReason`]. Strategies never
//! fail hard: missing prerequisites and render errors both become reasons.

mod correlation;
mod line;
pub mod palette;
mod render;
mod scatter;

pub use correlation::{CorrelationMatrix, CorrelationStrategy};
pub use line::LineStrategy;
pub use render::{ChartRenderer, PlottersRenderer};
pub use scatter::ScatterStrategy;

#[cfg(test)]
pub use render::RecordingRenderer;

use crate::models::{AbsenceReason, Category, ChartKind, Scope};
use crate::table::{parse_number, parse_timestamp, Table};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// X-axis description of time-based charts.
pub const TIME_LABEL: &str = "Zeit";

/// Points of a time-based chart, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// Everything a strategy needs besides the table.
pub struct ChartContext<'a> {
    pub category: Category,
    pub scope: &'a Scope,
    pub output_dir: &'a Path,
    pub time_token: &'a str,
    pub value_field: &'a str,
    pub renderer: &'a dyn ChartRenderer,
}

impl ChartContext<'_> {
    /// Deterministic artifact location for this category and chart kind.
    pub fn artifact_path(&self, kind: ChartKind) -> PathBuf {
        self.output_dir
            .join(self.scope.artifact_name(self.category, kind))
    }

    /// Chart title, e.g. `Stuhlgang – Larissa`.
    pub fn title(&self) -> String {
        format!("{} – {}", self.category.title(), self.scope.label())
    }

    /// Log a declined chart and hand the reason back.
    pub fn decline(&self, reason: AbsenceReason) -> AbsenceReason {
        info!(
            "No {} chart for '{}': {}",
            self.category,
            self.scope.label(),
            detail(&reason)
        );
        reason
    }

    /// Turn a renderer error into an absence reason.
    pub fn render_failed(&self, path: &Path, error: anyhow::Error) -> AbsenceReason {
        warn!(
            "Rendering {} for '{}' to {} failed: {:#}",
            self.category,
            self.scope.label(),
            path.display(),
            error
        );
        AbsenceReason::RenderFailed(error.to_string())
    }
}

fn detail(reason: &AbsenceReason) -> String {
    match reason {
        AbsenceReason::MissingValueField(field) => format!("entries missing '{}' field", field),
        other => other.to_string(),
    }
}

/// `(time, value)` pairs of two columns; rows where either cell does not
/// parse are dropped.
fn series_points(
    table: &Table,
    time_column: &str,
    value_column: &str,
) -> Vec<(NaiveDateTime, f64)> {
    let (Some(t), Some(v)) = (
        table.column_index(time_column),
        table.column_index(value_column),
    ) else {
        return Vec::new();
    };
    table
        .rows()
        .iter()
        .filter_map(|row| Some((parse_timestamp(&row[t])?, parse_number(&row[v])?)))
        .collect()
}

/// A chart type that turns a table into at most one artifact.
pub trait ChartStrategy {
    fn kind(&self) -> ChartKind;

    /// Produce the artifact, returning its path, or decline.
    fn produce(&self, table: &Table, ctx: &ChartContext<'_>) -> Result<PathBuf, AbsenceReason>;
}

/// Registered category that is intentionally not charted.
pub struct SkipStrategy;

impl ChartStrategy for SkipStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::Skip
    }

    fn produce(&self, _table: &Table, ctx: &ChartContext<'_>) -> Result<PathBuf, AbsenceReason> {
        Err(ctx.decline(AbsenceReason::IntentionallyExcluded))
    }
}

static SCATTER: ScatterStrategy = ScatterStrategy;
static LINE: LineStrategy = LineStrategy;
static CORRELATION: CorrelationStrategy = CorrelationStrategy;
static SKIP: SkipStrategy = SkipStrategy;

/// Strategy implementing a chart kind.
pub fn strategy_for(kind: ChartKind) -> &'static dyn ChartStrategy {
    match kind {
        ChartKind::Scatter => &SCATTER,
        ChartKind::Line => &LINE,
        ChartKind::Correlation => &CORRELATION,
        ChartKind::Skip => &SKIP,
    }
}
