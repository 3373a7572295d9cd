//! Conversion of data points into the prediction format consumed by the
//! evaluation harness, and JSONL output of the result.

use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::DataPoint;

/// One prediction line as the harness expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionEntry {
    pub instance_id: String,
    pub model_name_or_path: String,
    pub model_patch: String,
}

/// Running conversion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub success: usize,
    pub failed: usize,
}

/// Converts validated data points to prediction entries.
///
/// The model label is recorded on every entry; the report lookup must use the
/// same label, so both take it from one configured value.
pub struct PredictionFormatter {
    model_name: String,
    stats: Mutex<ConversionStats>,
}

impl PredictionFormatter {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            stats: Mutex::new(ConversionStats::default()),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Conversion counters accumulated over the life of this formatter.
    pub fn stats(&self) -> ConversionStats {
        *self.stats.lock()
    }

    /// Convert data points to prediction entries, dropping records with an
    /// empty instance id or patch. Drops are counted, never fatal.
    pub fn transform(&self, records: &[DataPoint]) -> Vec<PredictionEntry> {
        info!(count = records.len(), "converting data points to prediction format");

        let mut predictions = Vec::with_capacity(records.len());
        for record in records {
            match self.transform_record(record) {
                Some(entry) => {
                    predictions.push(entry);
                    self.stats.lock().success += 1;
                }
                None => {
                    self.stats.lock().failed += 1;
                }
            }
        }

        let stats = self.stats();
        info!(
            success = stats.success,
            failed = stats.failed,
            "conversion finished"
        );
        predictions
    }

    fn transform_record(&self, record: &DataPoint) -> Option<PredictionEntry> {
        if record.instance_id.is_empty() || record.patch.is_empty() {
            warn!(
                instance_id = %record.instance_id,
                patch_present = !record.patch.is_empty(),
                "cannot convert data point with missing fields"
            );
            return None;
        }

        Some(PredictionEntry {
            instance_id: record.instance_id.clone(),
            model_name_or_path: self.model_name.clone(),
            model_patch: record.patch.clone(),
        })
    }

    /// Write entries to `path`, one compact JSON object per line, newline
    /// terminated, replacing any previous content. The payload is assembled
    /// first and written in one call, so a success return means every entry
    /// reached the file.
    pub fn write_predictions(&self, predictions: &[PredictionEntry], path: &Path) -> Result<()> {
        info!(count = predictions.len(), path = %path.display(), "saving predictions");

        let mut payload = String::new();
        for entry in predictions {
            let line = serde_json::to_string(entry).with_context(|| {
                format!("failed to serialize prediction for '{}'", entry.instance_id)
            })?;
            payload.push_str(&line);
            payload.push('\n');
        }

        std::fs::write(path, payload)
            .with_context(|| format!("failed to write predictions file '{}'", path.display()))?;

        info!(path = %path.display(), "predictions saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(instance_id: &str, patch: &str) -> DataPoint {
        DataPoint {
            instance_id: instance_id.to_string(),
            repo: "octo/repo".to_string(),
            base_commit: "abc123".to_string(),
            patch: patch.to_string(),
            fail_to_pass: r#"["test_one"]"#.to_string(),
            pass_to_pass: "[]".to_string(),
        }
    }

    #[test]
    fn test_transform_maps_fields() {
        let formatter = PredictionFormatter::new("gpt-4");
        let predictions = formatter.transform(&[record("X", "diff")]);

        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].instance_id, "X");
        assert_eq!(predictions[0].model_name_or_path, "gpt-4");
        assert_eq!(predictions[0].model_patch, "diff");
    }

    #[test]
    fn test_transform_drops_incomplete_records_and_counts() {
        let formatter = PredictionFormatter::new("gpt-4");
        let records = vec![record("X", "diff"), record("", "diff"), record("Y", "")];

        let predictions = formatter.transform(&records);

        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].instance_id, "X");
        let stats = formatter.stats();
        assert_eq!(stats.success, 1);
        assert_eq!(stats.failed, 2);
    }

    #[test]
    fn test_serialized_line_matches_harness_shape() {
        let entry = PredictionEntry {
            instance_id: "X".to_string(),
            model_name_or_path: "gpt-4".to_string(),
            model_patch: "diff".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"instance_id":"X","model_name_or_path":"gpt-4","model_patch":"diff"}"#
        );
    }

    #[test]
    fn test_write_predictions_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions_x.jsonl");
        let formatter = PredictionFormatter::new("gpt-4");
        let predictions = formatter.transform(&[record("X", "diff"), record("Y", "other diff")]);

        formatter.write_predictions(&predictions, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with('\n'));
        let parsed: Vec<PredictionEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, predictions);
    }

    #[test]
    fn test_write_predictions_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let records = vec![record("X", "diff"), record("Y", "other diff")];

        let first = PredictionFormatter::new("gpt-4");
        let path_a = dir.path().join("a.jsonl");
        first
            .write_predictions(&first.transform(&records), &path_a)
            .unwrap();

        let second = PredictionFormatter::new("gpt-4");
        let path_b = dir.path().join("b.jsonl");
        second
            .write_predictions(&second.transform(&records), &path_b)
            .unwrap();

        assert_eq!(
            std::fs::read(&path_a).unwrap(),
            std::fs::read(&path_b).unwrap()
        );
    }

    #[test]
    fn test_write_predictions_overwrites_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.jsonl");
        std::fs::write(&path, "stale content\nstale content\n").unwrap();

        let formatter = PredictionFormatter::new("gpt-4");
        let predictions = formatter.transform(&[record("X", "diff")]);
        formatter.write_predictions(&predictions, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"instance_id\":\"X\""));
    }

    #[test]
    fn test_write_predictions_bad_destination_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-subdir").join("predictions.jsonl");

        let formatter = PredictionFormatter::new("gpt-4");
        let predictions = formatter.transform(&[record("X", "diff")]);

        assert!(formatter.write_predictions(&predictions, &path).is_err());
    }
}
