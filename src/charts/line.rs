//! Sorted line chart over a named value column.

use super::{series_points, ChartContext, ChartStrategy, TimeSeries, TIME_LABEL};
use crate::models::{AbsenceReason, ChartKind};
use crate::table::Table;
use std::path::PathBuf;
use tracing::debug;

/// Y-axis description of line charts.
const VALUE_LABEL: &str = "Stimmungswert";

/// Plots the configured value column against the time axis, in time order.
pub struct LineStrategy;

impl ChartStrategy for LineStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::Line
    }

    fn produce(&self, table: &Table, ctx: &ChartContext<'_>) -> Result<PathBuf, AbsenceReason> {
        if table.is_empty() {
            return Err(ctx.decline(AbsenceReason::NoEntries));
        }
        let time_column = table
            .time_axis(ctx.time_token)
            .ok_or_else(|| ctx.decline(AbsenceReason::NoTimeAxis))?;
        if !table.has_column(ctx.value_field) {
            return Err(ctx.decline(AbsenceReason::MissingValueField(
                ctx.value_field.to_string(),
            )));
        }

        let mut points = series_points(table, time_column, ctx.value_field);
        if points.is_empty() {
            return Err(ctx.decline(AbsenceReason::NoPlottableRows));
        }
        points.sort_by_key(|(ts, _)| *ts);
        debug!(
            "Line for {}: {} points, x={}",
            ctx.category,
            points.len(),
            time_column
        );

        let series = TimeSeries {
            title: ctx.title(),
            x_label: TIME_LABEL.to_string(),
            y_label: VALUE_LABEL.to_string(),
            points,
        };

        let path = ctx.artifact_path(self.kind());
        ctx.renderer
            .render_line(&series, &path)
            .map_err(|e| ctx.render_failed(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::test_support::{at, text};
    use crate::charts::RecordingRenderer;
    use crate::models::{Category, Record, Scope, Value};
    use std::path::Path;

    fn context<'a>(scope: &'a Scope, renderer: &'a RecordingRenderer) -> ChartContext<'a> {
        ChartContext {
            category: Category::Mood,
            scope,
            output_dir: Path::new("output"),
            time_token: "zeit",
            value_field: "wert",
            renderer,
        }
    }

    fn mood(day: u32, wert: Value) -> Record {
        Record::new()
            .with("userId", text("Larissa"))
            .with("zeitpunkt", Value::Timestamp(at(day, 12)))
            .with("wert", wert)
    }

    #[test]
    fn test_line_sorts_by_time() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Subject("Larissa".to_string());
        let records = vec![
            mood(4, Value::Integer(2)),
            mood(1, Value::Integer(5)),
            mood(2, Value::Float(3.5)),
        ];

        let path = LineStrategy
            .produce(&Table::from_records(&records), &context(&scope, &renderer))
            .unwrap();
        assert_eq!(path, PathBuf::from("output/stimmung_line_Larissa.png"));

        let series = renderer.last_series().unwrap();
        assert_eq!(series.y_label, "Stimmungswert");
        assert_eq!(
            series.points,
            vec![(at(1, 12), 5.0), (at(2, 12), 3.5), (at(4, 12), 2.0)]
        );
    }

    #[test]
    fn test_missing_value_field() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Subject("Larissa".to_string());
        let records = vec![Record::new()
            .with("zeitpunkt", Value::Timestamp(at(1, 12)))
            .with("laune", Value::Integer(3))];

        assert_eq!(
            LineStrategy.produce(&Table::from_records(&records), &context(&scope, &renderer)),
            Err(AbsenceReason::MissingValueField("wert".to_string()))
        );
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_requires_time_axis() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Subject("Larissa".to_string());
        let records = vec![Record::new().with("wert", Value::Integer(3))];

        assert_eq!(
            LineStrategy.produce(&Table::from_records(&records), &context(&scope, &renderer)),
            Err(AbsenceReason::NoTimeAxis)
        );
    }

    #[test]
    fn test_skips_unparseable_values() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Subject("Larissa".to_string());
        let records = vec![mood(1, text("gut")), mood(2, Value::Integer(4))];

        LineStrategy
            .produce(&Table::from_records(&records), &context(&scope, &renderer))
            .unwrap();
        assert_eq!(renderer.last_series().unwrap().points, vec![(at(2, 12), 4.0)]);
    }

    #[test]
    fn test_all_values_unparseable() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Subject("Larissa".to_string());
        let records = vec![mood(1, text("gut")), mood(2, Value::Null)];

        assert_eq!(
            LineStrategy.produce(&Table::from_records(&records), &context(&scope, &renderer)),
            Err(AbsenceReason::NoPlottableRows)
        );
    }
}
