//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cedmate-analytics.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".cedmate-analytics.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Document store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Column inference settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Chart output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Firestore connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project id. Read from the credentials file when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Database id.
    #[serde(default = "default_database")]
    pub database: String,

    /// REST endpoint; point it at an emulator for local runs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding a bearer access token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Field carrying the subject identifier.
    #[serde(default = "default_subject_field")]
    pub subject_field: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: default_database(),
            base_url: default_base_url(),
            access_token_env: default_access_token_env(),
            subject_field: default_subject_field(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_access_token_env() -> String {
    "FIRESTORE_ACCESS_TOKEN".to_string()
}

fn default_subject_field() -> String {
    "userId".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Timestamp detector selectable per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    /// Value exposes the store's timestamp conversion.
    Capability,
    /// Field name contains the time token.
    FieldName,
}

/// Column inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Token marking time-axis columns (matched case-insensitively).
    #[serde(default = "default_time_token")]
    pub time_token: String,

    /// Named value column of mood records.
    #[serde(default = "default_value_field")]
    pub value_field: String,

    /// Timestamp detectors, tried in order.
    #[serde(default = "default_detectors")]
    pub timestamp_detectors: Vec<DetectorKind>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            time_token: default_time_token(),
            value_field: default_value_field(),
            timestamp_detectors: default_detectors(),
        }
    }
}

fn default_time_token() -> String {
    "zeit".to_string()
}

fn default_value_field() -> String {
    "wert".to_string()
}

fn default_detectors() -> Vec<DetectorKind> {
    vec![DetectorKind::Capability, DetectorKind::FieldName]
}

/// Chart output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the image files.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Image width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// TrueType font used for labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            width: default_width(),
            height: default_height(),
            font_path: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// where they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.output_dir {
            self.output.dir = dir.clone();
        }
        if let Some(ref font) = args.font {
            self.output.font_path = Some(font.clone());
        }
        if let Some(ref project) = args.project {
            self.store.project_id = Some(project.clone());
        }
        if let Some(timeout) = args.timeout {
            self.store.timeout_seconds = timeout;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.subject_field, "userId");
        assert_eq!(config.analytics.time_token, "zeit");
        assert_eq!(config.analytics.value_field, "wert");
        assert_eq!(
            config.analytics.timestamp_detectors,
            vec![DetectorKind::Capability, DetectorKind::FieldName]
        );
        assert_eq!(config.output.dir, PathBuf::from("output"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[store]
project_id = "cedmate-test"
base_url = "http://localhost:8080/v1"

[analytics]
timestamp_detectors = ["field-name"]

[output]
dir = "charts"
width = 800
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.store.project_id.as_deref(), Some("cedmate-test"));
        assert_eq!(config.store.base_url, "http://localhost:8080/v1");
        assert_eq!(config.store.database, "(default)");
        assert_eq!(
            config.analytics.timestamp_detectors,
            vec![DetectorKind::FieldName]
        );
        assert_eq!(config.analytics.time_token, "zeit");
        assert_eq!(config.output.dir, PathBuf::from("charts"));
        assert_eq!(config.output.width, 800);
        assert_eq!(config.output.height, 500);
    }

    #[test]
    fn test_rejects_unknown_detector() {
        let toml_content = r#"
[analytics]
timestamp_detectors = ["guess"]
"#;
        assert!(toml::from_str::<Config>(toml_content).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[analytics]"));
        assert!(toml_str.contains("[output]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.analytics.value_field, "wert");
    }
}
