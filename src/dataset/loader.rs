use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use tracing::{debug, error, info, warn};

use super::types::DataPoint;

/// Loads benchmark data points from a directory of JSON files.
///
/// Malformed files are skipped with a warning; a single bad file never fails
/// the whole load. The loader keeps a count of data points it has accepted.
pub struct DatasetLoader {
    processed_count: AtomicUsize,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self {
            processed_count: AtomicUsize::new(0),
        }
    }

    /// Number of data points this loader has accepted so far.
    pub fn processed_count(&self) -> usize {
        self.processed_count.load(Ordering::Relaxed)
    }

    /// Load data points from `source_dir`.
    ///
    /// With no file list, every `*.json` file in the directory is considered,
    /// in file-name order. With a list, each name resolves to one file (the
    /// `.json` extension is appended when absent); names that resolve to no
    /// existing file are skipped with a warning.
    pub fn load_datasets(&self, source_dir: &Path, file_list: Option<&[String]>) -> Vec<DataPoint> {
        info!(dir = %source_dir.display(), "starting data point load");

        if !source_dir.exists() {
            error!(dir = %source_dir.display(), "source directory not found");
            return Vec::new();
        }

        let json_paths = match file_list {
            None => discover_json_files(source_dir),
            Some(names) => resolve_named_files(source_dir, names),
        };

        info!(count = json_paths.len(), "found JSON files for processing");

        if json_paths.is_empty() {
            warn!("no JSON files found for loading");
            return Vec::new();
        }

        let mut records = Vec::new();
        for path in &json_paths {
            debug!(file = %path.display(), "processing file");
            match load_record(path) {
                Ok(record) => {
                    info!(instance_id = %record.instance_id, "loaded data point");
                    records.push(record);
                    self.processed_count.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }

        info!(loaded = records.len(), "data point load finished");
        records
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_record(path: &Path) -> anyhow::Result<DataPoint> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;

    let record: DataPoint = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;

    record
        .validate()
        .with_context(|| format!("integrity check failed for '{}'", path.display()))?;

    Ok(record)
}

fn discover_json_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!(dir = %dir.display(), error = %e, "failed to list source directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();
    paths
}

fn resolve_named_files(dir: &Path, names: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for name in names {
        let filename = if name.ends_with(".json") {
            name.clone()
        } else {
            format!("{name}.json")
        };

        let full_path = dir.join(&filename);
        if full_path.exists() {
            paths.push(full_path);
        } else {
            warn!(file = %filename, "file not found");
        }
    }
    paths
}
