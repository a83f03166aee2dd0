//! Analytics orchestration.
//!
//! Runs fetch, normalize and chart for every registered category in turn.
//! Each category is its own error boundary: whatever happens to one shows
//! up in that category's result and the run moves on.

use crate::charts::{strategy_for, ChartContext, ChartRenderer};
use crate::config::{Config, DetectorKind};
use crate::fetch::{DetectorChain, RecordFetcher};
use crate::models::{
    AbsenceReason, AnalyticsReport, Category, CategoryResult, ChartKind, Scope, ID_FIELD,
};
use crate::store::DocumentStore;
use crate::table::Table;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Settings of one orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub output_dir: PathBuf,
    pub subject_field: String,
    pub time_token: String,
    pub value_field: String,
    pub timestamp_detectors: Vec<DetectorKind>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            output_dir: config.output.dir.clone(),
            subject_field: config.store.subject_field.clone(),
            time_token: config.analytics.time_token.clone(),
            value_field: config.analytics.value_field.clone(),
            timestamp_detectors: config.analytics.timestamp_detectors.clone(),
        }
    }
}

/// Static category-to-chart binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryBinding {
    pub category: Category,
    /// Chart drawn for a single subject.
    pub subject_chart: ChartKind,
    /// Chart drawn over the whole dataset.
    pub dataset_chart: ChartKind,
}

impl CategoryBinding {
    pub fn chart_for(&self, scope: &Scope) -> ChartKind {
        match scope {
            Scope::Subject(_) => self.subject_chart,
            Scope::Dataset => self.dataset_chart,
        }
    }
}

/// The registered categories, in processing order.
pub fn default_bindings() -> Vec<CategoryBinding> {
    vec![
        CategoryBinding {
            category: Category::BowelMovement,
            subject_chart: ChartKind::Scatter,
            dataset_chart: ChartKind::Correlation,
        },
        CategoryBinding {
            category: Category::Mood,
            subject_chart: ChartKind::Line,
            dataset_chart: ChartKind::Line,
        },
        CategoryBinding {
            category: Category::Symptom,
            subject_chart: ChartKind::Scatter,
            dataset_chart: ChartKind::Correlation,
        },
        CategoryBinding {
            category: Category::Meal,
            subject_chart: ChartKind::Skip,
            dataset_chart: ChartKind::Skip,
        },
    ]
}

/// Drives the pipeline over all bound categories.
pub struct Orchestrator<'a> {
    store: &'a dyn DocumentStore,
    renderer: &'a dyn ChartRenderer,
    config: OrchestratorConfig,
    bindings: Vec<CategoryBinding>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        renderer: &'a dyn ChartRenderer,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            renderer,
            config,
            bindings: default_bindings(),
        }
    }

    /// Replace the category bindings.
    #[allow(dead_code)] // Only the default registry ships today
    pub fn with_bindings(mut self, bindings: Vec<CategoryBinding>) -> Self {
        self.bindings = bindings;
        self
    }

    /// Process every bound category for `scope`.
    ///
    /// Never fails: the report holds one result per bound category.
    pub fn run(&self, scope: &Scope) -> AnalyticsReport {
        info!(
            "Generating analytics for {} ({} categories)",
            scope.label(),
            self.bindings.len()
        );

        if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
            warn!(
                "Failed to create output directory {}: {}",
                self.config.output_dir.display(),
                e
            );
        }

        let detectors =
            DetectorChain::from_kinds(&self.config.timestamp_detectors, &self.config.time_token);
        debug!("Timestamp detectors: {:?}", detectors.names());
        let fetcher = RecordFetcher::new(self.store, &self.config.subject_field, detectors);

        let mut report = AnalyticsReport::new(scope.clone());
        for binding in &self.bindings {
            let result = self.process(&fetcher, binding, scope);
            report.results.insert(binding.category, result);
        }

        info!(
            "Analytics for {} complete: {} of {} categories charted",
            scope.label(),
            report.artifact_count(),
            report.results.len()
        );
        report
    }

    fn process(
        &self,
        fetcher: &RecordFetcher<'_>,
        binding: &CategoryBinding,
        scope: &Scope,
    ) -> CategoryResult {
        let category = binding.category;
        let kind = binding.chart_for(scope);
        let ctx = ChartContext {
            category,
            scope,
            output_dir: &self.config.output_dir,
            time_token: &self.config.time_token,
            value_field: &self.config.value_field,
            renderer: self.renderer,
        };

        // Excluded categories are not fetched at all.
        let table = if kind == ChartKind::Skip {
            Table::default()
        } else {
            match fetcher.fetch(category.collection(), scope) {
                Ok(records) => Table::from_records(&records)
                    .with_key_columns([self.config.subject_field.as_str(), ID_FIELD]),
                Err(e) => {
                    warn!("Fetching {} for {} failed: {}", category, scope.label(), e);
                    return CategoryResult::absent(
                        category,
                        kind,
                        AbsenceReason::FetchFailed(e.to_string()),
                    );
                }
            }
        };
        debug!(
            "{}: {} rows, columns {:?}",
            category,
            table.row_count(),
            table.columns()
        );

        match strategy_for(kind).produce(&table, &ctx) {
            Ok(path) => {
                info!("{} chart written to {}", category, path.display());
                CategoryResult::artifact(category, kind, path)
            }
            Err(reason) => CategoryResult::absent(category, kind, reason),
        }
    }
}
