//! Command-line arguments.
//!
//! Selects the scope (one subject or the whole dataset), the document
//! source and the report outputs. Cross-field checks live in `validate`.

use clap::Parser;
use std::path::PathBuf;

/// CEDmate Analytics - charts from CEDmate health logs
///
/// Fetches a subject's bowel-movement, mood, symptom and meal records from
/// Firestore and writes one chart per category. Categories without usable
/// data are reported with the reason instead.
///
/// Examples:
///   cedmate-analytics --user Larissa
///   cedmate-analytics --user Larissa --creds ./serviceAccount.json
///   cedmate-analytics --all --output-dir charts --report-json report.json
///   cedmate-analytics --user Larissa --snapshot export.json
///   cedmate-analytics --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subject whose records are analyzed (exact match on the subject field)
    #[arg(
        short,
        long,
        value_name = "ID",
        required_unless_present_any = ["all", "init_config"],
        conflicts_with = "all"
    )]
    pub user: Option<String>,

    /// Analyze every subject at once (dataset charts)
    #[arg(long)]
    pub all: bool,

    /// Service account JSON; its project_id is used when none is configured
    #[arg(long, default_value = "serviceAccount.json", value_name = "FILE")]
    pub creds: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cedmate-analytics.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving the chart images
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// TrueType font for chart labels
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// Firestore project id (overrides config and credentials file)
    #[arg(long, value_name = "ID", env = "CEDMATE_PROJECT")]
    pub project: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Read documents from a JSON snapshot instead of Firestore
    ///
    /// Format: { "<collection>": [ { "id": ..., "<field>": ... }, ... ] }
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Also write the analytics report as JSON
    #[arg(long, value_name = "FILE")]
    pub report_json: Option<PathBuf>,

    /// Also write the analytics report as Markdown
    #[arg(long, value_name = "FILE")]
    pub report_md: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cedmate-analytics.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match (&self.user, self.all) {
            (Some(_), true) => return Err("Cannot use both --user and --all".to_string()),
            (None, false) => return Err("Either --user or --all is required".to_string()),
            (Some(user), false) if user.trim().is_empty() => {
                return Err("User id must not be empty".to_string());
            }
            (Some(user), false) if user.contains(['/', '\\']) => {
                return Err("User id must not contain path separators".to_string());
            }
            _ => {}
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref snapshot) = self.snapshot {
            if !snapshot.is_file() {
                return Err(format!("Snapshot file does not exist: {}", snapshot.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
