//! Report generation.
//!
//! Renders the analytics report as the per-category console summary, as
//! Markdown, and as JSON.

use crate::models::{AnalyticsReport, CategoryResult, Outcome};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// One line per category: `<category>: <path>` or `<category>: no output (<reason>)`.
pub fn summary_lines(report: &AnalyticsReport) -> Vec<String> {
    report
        .results
        .iter()
        .map(|(category, result)| format!("{}: {}", category, outcome_text(result)))
        .collect()
}

fn outcome_text(result: &CategoryResult) -> String {
    match &result.outcome {
        Outcome::Artifact { path } => path.display().to_string(),
        Outcome::Absent { reason } => format!("no output ({})", reason),
    }
}

/// Generate a Markdown report.
pub fn generate_markdown_report(report: &AnalyticsReport) -> String {
    let mut output = String::new();

    output.push_str("# CEDmate Analytics\n\n");

    let subject = report.scope.subject().unwrap_or("all subjects");
    output.push_str(&format!("- **Subject:** {}\n", subject));
    output.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!(
        "- **Charts:** {} of {}\n\n",
        report.artifact_count(),
        report.results.len()
    ));

    output.push_str("| Category | Chart | Outcome |\n");
    output.push_str("|---|---|---|\n");
    for (category, result) in &report.results {
        let outcome = match &result.outcome {
            Outcome::Artifact { path } => format!("`{}`", path.display()),
            Outcome::Absent { reason } => format!("no output ({})", reason),
        };
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            category,
            result.chart.file_tag(),
            outcome
        ));
    }

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalyticsReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &AnalyticsReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;
    write_file(path, &content)
}

/// Write a Markdown report to a file.
pub fn write_markdown_report(report: &AnalyticsReport, path: &Path) -> Result<()> {
    write_file(path, &generate_markdown_report(report))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
