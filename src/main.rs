//! CEDmate Analytics - chart generator for CEDmate health logs
//!
//! A CLI tool that reads schemaless per-subject log records from Firestore,
//! normalizes them into tables and renders one chart per category.
//!
//! Exit codes:
//!   0 - Run completed (individual categories may still lack a chart)
//!   1 - Bootstrap error (arguments, config, credentials, store setup)

mod analysis;
mod charts;
mod cli;
mod config;
mod fetch;
mod models;
mod report;
mod store;
mod table;

use analysis::{Orchestrator, OrchestratorConfig};
use anyhow::{anyhow, Context, Result};
use charts::PlottersRenderer;
use cli::Args;
use config::{Config, CONFIG_FILE};
use models::Scope;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use store::{DocumentStore, FirestoreClient, MemoryStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first so the file can enable verbose logging
    let (mut config, config_note) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, config.general.verbose);

    info!("CEDmate Analytics v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_note {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
        ConfigSource::Unreadable(e) => warn!("Failed to load config: {:#}", e),
    }

    if let Err(e) = run_analytics(args, config) {
        error!("Analytics failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Handle --init-config: generate a default .cedmate-analytics.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the store, field names and chart output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = if config_verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the analytics workflow for the requested scope.
fn run_analytics(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let scope = match args.user {
        Some(ref user) => Scope::Subject(user.clone()),
        None => Scope::Dataset,
    };

    // Step 1: Connect to the document store
    let store = open_store(&args, &config)?;

    // Step 2: Prepare chart rendering
    let renderer = PlottersRenderer::new(
        config.output.width,
        config.output.height,
        config.output.font_path.as_deref(),
    );
    if !renderer.has_labels() {
        info!("No usable font found; charts are drawn without labels");
    }

    // Step 3: Run the pipeline
    println!("📊 Generating analytics for {}...", scope.label());
    let orchestrator = Orchestrator::new(
        store.as_ref(),
        &renderer,
        OrchestratorConfig::from(&config),
    );
    let analytics = orchestrator.run(&scope);

    // Step 4: Report
    println!("\n📋 Results:");
    for line in report::summary_lines(&analytics) {
        println!("   {}", line);
    }

    if let Some(ref path) = args.report_json {
        report::write_json_report(&analytics, path)?;
        println!("\n📝 JSON report saved to: {}", path.display());
    }
    if let Some(ref path) = args.report_md {
        report::write_markdown_report(&analytics, path)?;
        println!("📝 Markdown report saved to: {}", path.display());
    }

    println!(
        "\n✅ Done in {:.1}s: {} of {} charts written to {}",
        start_time.elapsed().as_secs_f64(),
        analytics.artifact_count(),
        analytics.results.len(),
        config.output.dir.display()
    );
    Ok(())
}

/// Where the effective configuration came from.
enum ConfigSource {
    File(PathBuf),
    Defaults,
    Unreadable(anyhow::Error),
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` must load; a broken default file falls back to
/// defaults and is reported once logging is up.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(e))),
    }
}

/// The part of a service account file needed here.
#[derive(Debug, Deserialize)]
struct ServiceAccount {
    project_id: Option<String>,
}

/// Build the document store: a snapshot when given, Firestore otherwise.
fn open_store(args: &Args, config: &Config) -> Result<Box<dyn DocumentStore>> {
    if let Some(ref snapshot) = args.snapshot {
        info!("Reading documents from snapshot: {}", snapshot.display());
        let store = MemoryStore::load_snapshot(snapshot)?;
        return Ok(Box::new(store));
    }

    let project_id = match config.store.project_id {
        Some(ref id) => id.clone(),
        None => project_from_credentials(&args.creds)?,
    };

    let access_token = std::env::var(&config.store.access_token_env)
        .ok()
        .filter(|token| !token.trim().is_empty());
    if access_token.is_none() {
        warn!(
            "{} is not set; sending unauthenticated requests",
            config.store.access_token_env
        );
    }

    info!(
        "Using Firestore project '{}' at {}",
        project_id, config.store.base_url
    );
    let client = FirestoreClient::new(
        &config.store.base_url,
        &project_id,
        &config.store.database,
        access_token,
        config.store.timeout_seconds,
    )?;
    Ok(Box::new(client))
}

/// Read the project id from a service account file.
fn project_from_credentials(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;
    let account: ServiceAccount = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse credentials file: {}", path.display()))?;

    account
        .project_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("No project_id in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_project_from_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "service_account", "project_id": "cedmate-prod", "client_email": "x@y"}}"#
        )
        .unwrap();
        assert_eq!(project_from_credentials(file.path()).unwrap(), "cedmate-prod");
    }

    #[test]
    fn test_credentials_without_project() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "service_account"}}"#).unwrap();
        assert!(project_from_credentials(file.path()).is_err());
        assert!(project_from_credentials(Path::new("/nonexistent/sa.json")).is_err());
    }

    #[test]
    fn test_snapshot_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("export.json");
        std::fs::write(
            &snapshot,
            r#"{
                "stimmung": [
                    {"id": "a", "userId": "Larissa", "zeitpunkt": "2024-05-01 08:00", "wert": 3},
                    {"id": "b", "userId": "Larissa", "zeitpunkt": "2024-05-02 08:00", "wert": 4}
                ]
            }"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.output.dir = dir.path().join("charts");
        let args = Args {
            user: Some("Larissa".to_string()),
            all: false,
            creds: dir.path().join("missing.json"),
            config: None,
            output_dir: None,
            font: None,
            project: None,
            timeout: None,
            snapshot: Some(snapshot),
            report_json: None,
            report_md: None,
            verbose: false,
            quiet: false,
            init_config: false,
        };

        let store = open_store(&args, &config).unwrap();
        let renderer = PlottersRenderer::new(400, 300, None);
        let orchestrator =
            Orchestrator::new(store.as_ref(), &renderer, OrchestratorConfig::from(&config));
        let report = orchestrator.run(&Scope::Subject("Larissa".to_string()));

        let mood = report.get(models::Category::Mood).unwrap();
        let path = mood.path().unwrap();
        assert_eq!(path, &config.output.dir.join("stimmung_line_Larissa.png"));
        assert!(path.exists());
        assert_eq!(
            report.get(models::Category::BowelMovement).unwrap().reason(),
            Some(&models::AbsenceReason::NoEntries)
        );
    }
}
