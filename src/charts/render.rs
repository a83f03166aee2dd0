//! PNG rendering with plotters.
//!
//! Labels need a TrueType font. The configured font, or the first system
//! font found, is registered once per process; without one the charts are
//! drawn unlabelled.

use super::{palette, CorrelationMatrix, TimeSeries};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle, FontTransform};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Font family the charts use for every label.
const FONT: &str = "sans-serif";

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const LEGEND_WIDTH: i32 = 90;
const LEGEND_STEPS: i32 = 100;

static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Draws chart data to image files.
pub trait ChartRenderer {
    fn render_scatter(&self, series: &TimeSeries, path: &Path) -> Result<()>;
    fn render_line(&self, series: &TimeSeries, path: &Path) -> Result<()>;
    fn render_correlation(&self, matrix: &CorrelationMatrix, path: &Path) -> Result<()>;
}

/// Bitmap renderer writing PNG files of a fixed size.
pub struct PlottersRenderer {
    width: u32,
    height: u32,
    labels: bool,
}

impl PlottersRenderer {
    pub fn new(width: u32, height: u32, font_path: Option<&Path>) -> Self {
        Self {
            width,
            height,
            labels: ensure_font(font_path),
        }
    }

    /// Whether titles, axis descriptions and tick labels are drawn.
    pub fn has_labels(&self) -> bool {
        self.labels
    }

    fn draw_time_chart(&self, series: &TimeSeries, path: &Path, connect: bool) -> Result<()> {
        if series.points.is_empty() {
            bail!("no points to draw");
        }
        let (x_range, y_range) = time_ranges(&series.points);

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(15);
        if self.labels {
            builder
                .caption(&series.title, (FONT, 22).into_font())
                .x_label_area_size(45)
                .y_label_area_size(60);
        }
        let mut chart = builder
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        if self.labels {
            chart
                .configure_mesh()
                .x_desc(series.x_label.as_str())
                .y_desc(series.y_label.as_str())
                .x_labels(6)
                .x_label_formatter(&format_tick)
                .label_style((FONT, 13).into_font())
                .draw()
                .map_err(draw_err)?;
        }

        if connect {
            let stroke = palette::sequential(0.3);
            chart
                .draw_series(LineSeries::new(
                    series.points.iter().map(|(ts, y)| (epoch_seconds(ts), *y)),
                    stroke.stroke_width(2),
                ))
                .map_err(draw_err)?;
            chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .map(|(ts, y)| Circle::new((epoch_seconds(ts), *y), 3, stroke.filled())),
                )
                .map_err(draw_err)?;
        } else {
            let colors = point_colors(&series.points);
            chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .zip(colors)
                        .map(|((ts, y), color)| {
                            Circle::new((epoch_seconds(ts), *y), 5, color.filled())
                        }),
                )
                .map_err(draw_err)?;
        }

        root.present()
            .map_err(draw_err)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render_scatter(&self, series: &TimeSeries, path: &Path) -> Result<()> {
        self.draw_time_chart(series, path, false)
    }

    fn render_line(&self, series: &TimeSeries, path: &Path) -> Result<()> {
        self.draw_time_chart(series, path, true)
    }

    fn render_correlation(&self, matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
        let n = matrix.size() as i32;
        if n == 0 {
            bail!("empty correlation matrix");
        }

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let (w, h) = (self.width as i32, self.height as i32);
        let (grid_area, legend_area) = root.split_horizontally(w - LEGEND_WIDTH);

        let (top, left, bottom) = if self.labels { (40, 120, 120) } else { (10, 10, 10) };
        let cell = ((w - LEGEND_WIDTH - left - 10).min(h - top - bottom) / n).max(1);

        for (i, row) in matrix.values.iter().enumerate() {
            for (j, r) in row.iter().enumerate() {
                let x0 = left + j as i32 * cell;
                let y0 = top + i as i32 * cell;
                grid_area
                    .draw(&Rectangle::new(
                        [(x0, y0), (x0 + cell, y0 + cell)],
                        palette::diverging(*r).filled(),
                    ))
                    .map_err(draw_err)?;
            }
        }

        let bar_top = top;
        let bar_height = (h - top - bottom).max(LEGEND_STEPS);
        for step in 0..LEGEND_STEPS {
            let r = 1.0 - 2.0 * step as f64 / (LEGEND_STEPS - 1) as f64;
            let y0 = bar_top + bar_height * step / LEGEND_STEPS;
            let y1 = bar_top + bar_height * (step + 1) / LEGEND_STEPS;
            legend_area
                .draw(&Rectangle::new(
                    [(15, y0), (40, y1)],
                    palette::diverging(r).filled(),
                ))
                .map_err(draw_err)?;
        }

        if self.labels {
            let font = (FONT, 14).into_font();
            let rotated = (FONT, 14).into_font().transform(FontTransform::Rotate90);

            grid_area
                .draw(&Text::new(
                    matrix.title.clone(),
                    (left, 10),
                    (FONT, 20).into_font(),
                ))
                .map_err(draw_err)?;

            for (k, label) in matrix.labels.iter().enumerate() {
                let center = k as i32 * cell + cell / 2;
                grid_area
                    .draw(&Text::new(label.clone(), (5, top + center - 7), font.clone()))
                    .map_err(draw_err)?;
                grid_area
                    .draw(&Text::new(
                        label.clone(),
                        (left + center + 7, top + n * cell + 5),
                        rotated.clone(),
                    ))
                    .map_err(draw_err)?;
            }

            let ticks = [
                ("1", bar_top),
                ("0", bar_top + bar_height / 2 - 7),
                ("-1", bar_top + bar_height - 14),
            ];
            for (value, y) in ticks {
                legend_area
                    .draw(&Text::new(value, (45, y), font.clone()))
                    .map_err(draw_err)?;
            }
        }

        root.present()
            .map_err(draw_err)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Register the label font once. Returns whether labels can be drawn.
fn ensure_font(configured: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| match load_font(configured) {
        Ok(path) => {
            debug!("Registered chart font {}", path.display());
            true
        }
        Err(e) if configured.is_some() => {
            warn!("Drawing charts without labels: {:#}", e);
            false
        }
        Err(e) => {
            debug!("Drawing charts without labels: {:#}", e);
            false
        }
    })
}

fn load_font(configured: Option<&Path>) -> Result<PathBuf> {
    let path = match configured {
        Some(path) => path.to_path_buf(),
        None => SYSTEM_FONTS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .ok_or_else(|| anyhow!("no system font found"))?,
    };

    let bytes = std::fs::read(&path)
        .with_context(|| format!("Failed to read font: {}", path.display()))?;
    // plotters keeps registered fonts for the rest of the process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT, FontStyle::Normal, bytes)
        .map_err(|_| anyhow!("{} is not a usable TrueType font", path.display()))?;
    Ok(path)
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("{}", e)
}

fn epoch_seconds(ts: &NaiveDateTime) -> f64 {
    ts.and_utc().timestamp() as f64
}

fn format_tick(x: &f64) -> String {
    DateTime::from_timestamp(*x as i64, 0)
        .map(|ts| ts.format("%d.%m.%Y").to_string())
        .unwrap_or_default()
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Scatter fills: the sequential scale over the series' own y range.
fn point_colors(points: &[(NaiveDateTime, f64)]) -> Vec<RGBColor> {
    let (lo, hi) = bounds(points.iter().map(|(_, y)| *y));
    points
        .iter()
        .map(|(_, y)| palette::sequential(palette::normalize(*y, lo, hi)))
        .collect()
}

/// Padded axis range; a single distinct value gets `fallback` on each side.
fn padded(lo: f64, hi: f64, fallback: f64) -> Range<f64> {
    let margin = if hi > lo { (hi - lo) * 0.05 } else { fallback };
    (lo - margin)..(hi + margin)
}

fn time_ranges(points: &[(NaiveDateTime, f64)]) -> (Range<f64>, Range<f64>) {
    let (x_lo, x_hi) = bounds(points.iter().map(|(ts, _)| epoch_seconds(ts)));
    let (y_lo, y_hi) = bounds(points.iter().map(|(_, y)| *y));
    (padded(x_lo, x_hi, 3600.0), padded(y_lo, y_hi, 1.0))
}

/// Renderer double that records what it was asked to draw.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingRenderer {
    calls: std::cell::RefCell<Vec<Rendered>>,
    failure: Option<String>,
}

#[cfg(test)]
enum Rendered {
    Series(TimeSeries, PathBuf),
    Matrix(CorrelationMatrix, PathBuf),
}

#[cfg(test)]
impl RecordingRenderer {
    /// A renderer whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Default::default(),
            failure: Some(message.to_string()),
        }
    }

    /// Paths of every successful render call, in order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .map(|call| match call {
                Rendered::Series(_, path) | Rendered::Matrix(_, path) => path.clone(),
            })
            .collect()
    }

    pub fn last_series(&self) -> Option<TimeSeries> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            Rendered::Series(series, _) => Some(series.clone()),
            Rendered::Matrix(..) => None,
        })
    }

    pub fn last_matrix(&self) -> Option<CorrelationMatrix> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            Rendered::Matrix(matrix, _) => Some(matrix.clone()),
            Rendered::Series(..) => None,
        })
    }

    fn record(&self, call: Rendered) -> Result<()> {
        if let Some(message) = &self.failure {
            bail!("{}", message);
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

#[cfg(test)]
impl ChartRenderer for RecordingRenderer {
    fn render_scatter(&self, series: &TimeSeries, path: &Path) -> Result<()> {
        self.record(Rendered::Series(series.clone(), path.to_path_buf()))
    }

    fn render_line(&self, series: &TimeSeries, path: &Path) -> Result<()> {
        self.record(Rendered::Series(series.clone(), path.to_path_buf()))
    }

    fn render_correlation(&self, matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
        self.record(Rendered::Matrix(matrix.clone(), path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::test_support::at;

    const PNG_MAGIC: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    fn series() -> TimeSeries {
        TimeSeries {
            title: "Stimmung – Larissa".to_string(),
            x_label: "Zeit".to_string(),
            y_label: "Stimmungswert".to_string(),
            points: vec![(at(1, 8), 3.0), (at(2, 8), 5.0), (at(4, 8), 2.0)],
        }
    }

    #[test]
    fn test_padded_ranges() {
        assert_eq!(padded(0.0, 10.0, 1.0), -0.5..10.5);
        assert_eq!(padded(4.0, 4.0, 1.0), 3.0..5.0);
    }

    #[test]
    fn test_scatter_color_follows_value() {
        let colors = point_colors(&series().points);
        // Points are 3.0, 5.0 and 2.0: the largest gets the bright end.
        assert_eq!(colors[1], palette::sequential(1.0));
        assert_eq!(colors[2], palette::sequential(0.0));
        assert_eq!(colors[0], palette::sequential(1.0 / 3.0));
        assert_ne!(colors[0], colors[1]);

        let flat = point_colors(&[(at(1, 8), 4.0), (at(2, 8), 4.0)]);
        assert_eq!(flat, vec![palette::sequential(0.5); 2]);
    }

    #[test]
    fn test_format_tick() {
        let x = epoch_seconds(&at(3, 12));
        assert_eq!(format_tick(&x), "03.05.2024");
    }

    #[test]
    fn test_renders_png_files() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PlottersRenderer::new(400, 300, None);

        let line = dir.path().join("stimmung_line_Larissa.png");
        renderer.render_line(&series(), &line).unwrap();
        let scatter = dir.path().join("stuhlgang_scatter_Larissa.png");
        renderer.render_scatter(&series(), &scatter).unwrap();

        let matrix = CorrelationMatrix {
            title: "Symptome – alle".to_string(),
            labels: vec!["schmerz".to_string(), "energie".to_string()],
            values: vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]],
        };
        let heatmap = dir.path().join("symptome_correlation.png");
        renderer.render_correlation(&matrix, &heatmap).unwrap();

        for path in [line, scatter, heatmap] {
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(&bytes[..8], &PNG_MAGIC, "{}", path.display());
        }
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PlottersRenderer::new(400, 300, None);
        let mut empty = series();
        empty.points.clear();
        assert!(renderer
            .render_scatter(&empty, &dir.path().join("x.png"))
            .is_err());
    }

    #[test]
    fn test_recording_renderer_failure() {
        let renderer = RecordingRenderer::failing("disk full");
        let err = renderer
            .render_line(&series(), Path::new("out.png"))
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(renderer.calls().is_empty());
    }
}
