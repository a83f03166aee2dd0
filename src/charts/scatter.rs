//! Time-colored scatter chart.

use super::{series_points, ChartContext, ChartStrategy, TimeSeries, TIME_LABEL};
use crate::models::{AbsenceReason, Category, ChartKind};
use crate::table::Table;
use std::path::PathBuf;
use tracing::debug;

/// Plots the first numeric column against the time axis, points colored by value.
pub struct ScatterStrategy;

impl ChartStrategy for ScatterStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::Scatter
    }

    fn produce(&self, table: &Table, ctx: &ChartContext<'_>) -> Result<PathBuf, AbsenceReason> {
        if table.is_empty() {
            return Err(ctx.decline(AbsenceReason::NoEntries));
        }
        let time_column = table
            .time_axis(ctx.time_token)
            .ok_or_else(|| ctx.decline(AbsenceReason::NoTimeAxis))?;
        let value_column = table
            .value_axis(ctx.time_token)
            .ok_or_else(|| ctx.decline(AbsenceReason::NoNumericField))?;

        let points = series_points(table, time_column, value_column);
        if points.is_empty() {
            return Err(ctx.decline(AbsenceReason::NoPlottableRows));
        }
        debug!(
            "Scatter for {}: {} points, x={}, y={}",
            ctx.category,
            points.len(),
            time_column,
            value_column
        );

        let y_label = match ctx.category {
            Category::Symptom => "Symptomstärke".to_string(),
            _ => value_column.to_string(),
        };
        let series = TimeSeries {
            title: ctx.title(),
            x_label: TIME_LABEL.to_string(),
            y_label,
            points,
        };

        let path = ctx.artifact_path(self.kind());
        ctx.renderer
            .render_scatter(&series, &path)
            .map_err(|e| ctx.render_failed(&path, e))?;
        Ok(path)
    }
}
