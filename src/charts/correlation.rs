//! Pairwise Pearson correlation over the numeric columns of a table.

use super::{ChartContext, ChartStrategy};
use crate::models::{AbsenceReason, ChartKind};
use crate::table::{parse_number, Table};
use std::path::PathBuf;
use tracing::debug;

/// Square, symmetric correlation matrix with one label per numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub title: String,
    pub labels: Vec<String>,
    /// Row-major; `values[i][j]` correlates `labels[i]` with `labels[j]`.
    /// Undefined correlations are NaN.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.labels.len()
    }
}

/// Pearson correlation of paired observations.
///
/// Returns NaN for fewer than two pairs or when either side has zero
/// variance; otherwise the result lies in [-1, 1].
pub fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Correlation matrix over the table's numeric columns, using
/// pairwise-complete observations. The diagonal is 1.0.
pub fn correlation_matrix(table: &Table, time_token: &str, title: String) -> CorrelationMatrix {
    let labels: Vec<String> = table
        .numeric_columns(time_token)
        .into_iter()
        .map(str::to_string)
        .collect();

    let columns: Vec<Vec<Option<f64>>> = labels
        .iter()
        .map(|name| {
            table
                .column(name)
                .unwrap_or_default()
                .into_iter()
                .map(parse_number)
                .collect()
        })
        .collect();

    let n = labels.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let pairs: Vec<(f64, f64)> = columns[i]
                .iter()
                .zip(&columns[j])
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .collect();
            let r = pearson(&pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        title,
        labels,
        values,
    }
}

/// Heat-mapped correlation matrix of all numeric columns.
pub struct CorrelationStrategy;

impl ChartStrategy for CorrelationStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::Correlation
    }

    fn produce(&self, table: &Table, ctx: &ChartContext<'_>) -> Result<PathBuf, AbsenceReason> {
        if table.is_empty() {
            return Err(ctx.decline(AbsenceReason::NoEntries));
        }
        let matrix = correlation_matrix(table, ctx.time_token, ctx.title());
        match matrix.size() {
            0 => return Err(ctx.decline(AbsenceReason::NoNumericField)),
            1 => return Err(ctx.decline(AbsenceReason::TooFewNumericFields)),
            _ => {}
        }
        debug!("Correlation for {} over {:?}", ctx.category, matrix.labels);

        let path = ctx.artifact_path(self.kind());
        ctx.renderer
            .render_correlation(&matrix, &path)
            .map_err(|e| ctx.render_failed(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::test_support::text;
    use crate::charts::RecordingRenderer;
    use crate::models::{Category, Record, Scope, Value};
    use std::path::Path;

    const EPS: f64 = 1e-9;

    fn entry(matrix: &CorrelationMatrix, a: &str, b: &str) -> Option<f64> {
        let i = matrix.labels.iter().position(|l| l == a)?;
        let j = matrix.labels.iter().position(|l| l == b)?;
        Some(matrix.values[i][j])
    }

    fn context<'a>(scope: &'a Scope, renderer: &'a RecordingRenderer) -> ChartContext<'a> {
        ChartContext {
            category: Category::Symptom,
            scope,
            output_dir: Path::new("output"),
            time_token: "zeit",
            value_field: "wert",
            renderer,
        }
    }

    fn symptom(schmerz: i64, energie: f64) -> Record {
        Record::new()
            .with("zeitpunkt", text("2024-05-01 08:00"))
            .with("schmerz", Value::Integer(schmerz))
            .with("energie", Value::Float(energie))
    }

    #[test]
    fn test_pearson_basics() {
        assert!((pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]) - 1.0).abs() < EPS);
        assert!((pearson(&[(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)]) + 1.0).abs() < EPS);
        assert!(pearson(&[(1.0, 1.0)]).is_nan());
        assert!(pearson(&[(1.0, 5.0), (2.0, 5.0), (3.0, 5.0)]).is_nan());
    }

    #[test]
    fn test_perfect_negative_correlation() {
        let records = vec![symptom(1, 9.0), symptom(2, 7.0), symptom(3, 5.0), symptom(4, 3.0)];
        let matrix = correlation_matrix(&Table::from_records(&records), "zeit", String::new());

        assert_eq!(matrix.labels, vec!["schmerz", "energie"]);
        let r = entry(&matrix, "schmerz", "energie").unwrap();
        assert!((r + 1.0).abs() < EPS);
    }

    #[test]
    fn test_matrix_symmetric_with_unit_diagonal() {
        let records = vec![
            symptom(1, 2.0).with("dauer", Value::Integer(10)),
            symptom(5, 1.0).with("dauer", Value::Integer(30)),
            symptom(2, 8.0).with("dauer", Value::Integer(20)),
            symptom(4, 4.0),
        ];
        let matrix = correlation_matrix(&Table::from_records(&records), "zeit", String::new());

        assert_eq!(matrix.size(), 3);
        for i in 0..3 {
            assert_eq!(matrix.values[i][i], 1.0);
            for j in 0..3 {
                let (a, b) = (matrix.values[i][j], matrix.values[j][i]);
                assert!(a == b || (a.is_nan() && b.is_nan()));
                assert!(a.is_nan() || (-1.0..=1.0).contains(&a));
            }
        }
    }

    #[test]
    fn test_zero_variance_is_nan() {
        let records = vec![symptom(3, 1.0), symptom(3, 2.0), symptom(3, 4.0)];
        let matrix = correlation_matrix(&Table::from_records(&records), "zeit", String::new());
        assert!(entry(&matrix, "schmerz", "energie").unwrap().is_nan());
        assert_eq!(entry(&matrix, "schmerz", "schmerz"), Some(1.0));
    }

    #[test]
    fn test_strategy_renders_matrix() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Dataset;
        let records = vec![symptom(1, 9.0), symptom(2, 7.0), symptom(3, 5.0)];

        let path = CorrelationStrategy
            .produce(&Table::from_records(&records), &context(&scope, &renderer))
            .unwrap();
        assert_eq!(path, PathBuf::from("output/symptome_correlation.png"));

        let matrix = renderer.last_matrix().unwrap();
        assert_eq!(matrix.title, "Symptome – alle");
        assert_eq!(matrix.size(), 2);
    }

    #[test]
    fn test_single_numeric_column_declines() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Dataset;
        let records = vec![Record::new().with("schmerz", Value::Integer(3))];

        let table = Table::from_records(&records);
        assert_eq!(
            CorrelationStrategy.produce(&table, &context(&scope, &renderer)),
            Err(AbsenceReason::TooFewNumericFields)
        );
    }

    #[test]
    fn test_no_numeric_column_declines() {
        let renderer = RecordingRenderer::default();
        let scope = Scope::Dataset;
        let records = vec![Record::new().with("notiz", text("Kopfweh"))];

        let table = Table::from_records(&records);
        assert_eq!(
            CorrelationStrategy.produce(&table, &context(&scope, &renderer)),
            Err(AbsenceReason::NoNumericField)
        );
    }
}
