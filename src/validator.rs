//! Per-record pipeline orchestration and batch aggregation.
//!
//! Each requested data point flows through load, prediction formatting,
//! harness evaluation, and report reconciliation. The first failing stage
//! settles that record's status; one record never aborts the batch.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::dataset::DatasetLoader;
use crate::harness::{HarnessConfig, HarnessRunner};
use crate::predictions::PredictionFormatter;
use crate::report::{ResultAnalyzer, ValidationAnalysis, ValidationStatus};

/// Batch-level tunables. The model label set here flows to both the
/// prediction entries and the report lookup path.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Directory holding the data point JSON files.
    pub data_dir: PathBuf,
    /// Model label recorded on predictions and used in report paths.
    pub model: String,
    /// Directory the predictions files are written to.
    pub predictions_dir: PathBuf,
    /// Root under which the harness writes per-run evaluation logs.
    pub eval_logs_dir: PathBuf,
    /// How many data points are evaluated concurrently.
    pub concurrency: usize,
    pub harness: HarnessConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data_points"),
            model: "gpt-4".to_string(),
            predictions_dir: PathBuf::from("."),
            eval_logs_dir: PathBuf::from("logs/run_evaluation"),
            concurrency: 1,
            harness: HarnessConfig::default(),
        }
    }
}

/// Terminal result for one requested data point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub record_name: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    pub status: ValidationStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub analysis: Option<ValidationAnalysis>,
    pub duration_sec: f64,
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    fn stage_failure(
        name: &str,
        instance_id: Option<String>,
        status: ValidationStatus,
        error: String,
        started: Instant,
    ) -> Self {
        Self {
            record_name: name.to_string(),
            instance_id,
            run_id: None,
            status,
            error: Some(error),
            analysis: None,
            duration_sec: started.elapsed().as_secs_f64(),
        }
    }
}

/// Aggregated batch results, keyed by requested record name in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub success_percentage: f64,
    pub individual_results: IndexMap<String, RecordOutcome>,
}

/// Drives the whole validation pipeline for a batch of data points.
pub struct DataPointValidator {
    config: ValidatorConfig,
    loader: DatasetLoader,
    formatter: PredictionFormatter,
    runner: HarnessRunner,
    analyzer: ResultAnalyzer,
}

impl DataPointValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let formatter = PredictionFormatter::new(config.model.clone());
        let runner = HarnessRunner::new(config.harness.clone());
        let analyzer = ResultAnalyzer::new(config.eval_logs_dir.clone(), config.model.clone());
        Self {
            loader: DatasetLoader::new(),
            formatter,
            runner,
            analyzer,
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate the given data points, or every data point in the data
    /// directory when no explicit targets are given.
    ///
    /// Per-record failures become data in the summary; the only `Err` cases
    /// are an empty target set and orchestration-level surprises.
    pub async fn run(&self, targets: Option<Vec<String>>) -> Result<ValidationSummary> {
        let started_at = Utc::now();

        let targets = match targets {
            Some(names) => {
                info!(count = names.len(), "processing requested data points");
                names
            }
            None => {
                let names = self.discover_record_names()?;
                info!(count = names.len(), "processing all data points in directory");
                names
            }
        };

        if targets.is_empty() {
            bail!("no data point files found to process");
        }

        let width = self.config.concurrency.max(1);
        let outcomes: Vec<RecordOutcome> = stream::iter(&targets)
            .map(|name| self.process_record(name))
            .buffered(width)
            .collect()
            .await;

        let mut success_count = 0usize;
        let mut error_count = 0usize;
        let mut individual_results = IndexMap::with_capacity(targets.len());
        for (name, outcome) in targets.iter().zip(outcomes) {
            if outcome.is_success() {
                success_count += 1;
            } else {
                error_count += 1;
                error!(record = %name, status = ?outcome.status, "data point failed validation");
            }
            individual_results.insert(name.clone(), outcome);
        }

        let total_processed = targets.len();
        let success_percentage = if total_processed > 0 {
            success_count as f64 / total_processed as f64 * 100.0
        } else {
            0.0
        };

        Ok(ValidationSummary {
            started_at,
            finished_at: Utc::now(),
            total_processed,
            success_count,
            error_count,
            success_percentage,
            individual_results,
        })
    }

    /// Run one data point through the four pipeline stages.
    async fn process_record(&self, name: &str) -> RecordOutcome {
        info!(record = %name, "processing data point");
        let started = Instant::now();
        let run_id = name.to_string();
        let predictions_path = self
            .config
            .predictions_dir
            .join(format!("predictions_{name}.jsonl"));

        let requested = [name.to_string()];
        let records = self
            .loader
            .load_datasets(&self.config.data_dir, Some(&requested));
        let Some(record) = records.into_iter().next() else {
            return RecordOutcome::stage_failure(
                name,
                None,
                ValidationStatus::LoadFailed,
                format!("failed to load {name}.json"),
                started,
            );
        };
        let instance_id = record.instance_id.clone();

        let predictions = self.formatter.transform(std::slice::from_ref(&record));
        if predictions.is_empty() {
            return RecordOutcome::stage_failure(
                name,
                Some(instance_id),
                ValidationStatus::ConvertFailed,
                "failed to convert to prediction format".to_string(),
                started,
            );
        }
        if let Err(e) = self.formatter.write_predictions(&predictions, &predictions_path) {
            return RecordOutcome::stage_failure(
                name,
                Some(instance_id),
                ValidationStatus::ConvertFailed,
                format!("failed to save predictions file: {e:#}"),
                started,
            );
        }

        if let Err(e) = self.runner.run_evaluation(&predictions_path, &run_id).await {
            return RecordOutcome::stage_failure(
                name,
                Some(instance_id),
                ValidationStatus::HarnessFailed,
                format!("harness evaluation failed: {e}"),
                started,
            );
        }

        let analysis = self.analyzer.analyze(&record, &run_id);
        RecordOutcome {
            record_name: name.to_string(),
            instance_id: Some(instance_id),
            run_id: Some(run_id),
            status: analysis.validation_status.clone(),
            error: None,
            analysis: Some(analysis),
            duration_sec: started.elapsed().as_secs_f64(),
        }
    }

    /// Stems of every `*.json` file in the data directory, in name order.
    fn discover_record_names(&self) -> Result<Vec<String>> {
        let dir = &self.config.data_dir;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to list data directory '{}'", dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to list data directory '{}'", dir.display()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
