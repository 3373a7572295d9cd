//! Evaluation report lookup and reconciliation of expected test outcomes
//! against what the harness observed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::DataPoint;

/// Terminal judgment for one data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Success,
    TestMismatch,
    ReportNotFound,
    ReadError,
    LoadFailed,
    ConvertFailed,
    HarnessFailed,
}

impl ValidationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Outcome of comparing a data point's expectations against the harness
/// report. The match bits, the resolved flag, and all four raw test lists are
/// carried even when the verdict is success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationAnalysis {
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub problem_resolved: bool,
    #[serde(default)]
    pub failing_tests_match: bool,
    #[serde(default)]
    pub passing_tests_match: bool,
    #[serde(default)]
    pub expected_failing_tests: Vec<String>,
    #[serde(default)]
    pub actual_failing_tests: Vec<String>,
    #[serde(default)]
    pub expected_passing_tests: Vec<String>,
    #[serde(default)]
    pub actual_passing_tests: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ValidationAnalysis {
    fn failure(status: ValidationStatus, error: String) -> Self {
        Self {
            validation_status: status,
            problem_resolved: false,
            failing_tests_match: false,
            passing_tests_match: false,
            expected_failing_tests: Vec::new(),
            actual_failing_tests: Vec::new(),
            expected_passing_tests: Vec::new(),
            actual_passing_tests: Vec::new(),
            error: Some(error),
        }
    }

    fn not_found(path: &Path) -> Self {
        Self::failure(
            ValidationStatus::ReportNotFound,
            format!("report file {} does not exist", path.display()),
        )
    }

    fn read_error(message: String) -> Self {
        Self::failure(ValidationStatus::ReadError, message)
    }
}

// Permissive view of the harness report entry. Anything missing means the
// harness observed nothing, not that the report is invalid.
#[derive(Debug, Clone, Default, Deserialize)]
struct InstanceReport {
    #[serde(default)]
    resolved: bool,
    #[serde(default)]
    tests_status: TestsStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TestsStatus {
    #[serde(default, rename = "FAIL_TO_PASS")]
    fail_to_pass: TestOutcome,
    #[serde(default, rename = "PASS_TO_PASS")]
    pass_to_pass: TestOutcome,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TestOutcome {
    #[serde(default)]
    success: Vec<String>,
}

/// Locates harness reports and reconciles them with record expectations.
///
/// The model label must be the same one the prediction entries carry, since
/// the harness namespaces its report directory by it.
pub struct ResultAnalyzer {
    logs_root: PathBuf,
    model: String,
}

impl ResultAnalyzer {
    pub fn new(logs_root: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            logs_root: logs_root.into(),
            model: model.into(),
        }
    }

    /// Where the harness writes the report for one instance of one run.
    pub fn report_path(&self, run_id: &str, instance_id: &str) -> PathBuf {
        self.logs_root
            .join(run_id)
            .join(&self.model)
            .join(instance_id)
            .join("report.json")
    }

    /// Compare the record's expected test outcomes against the harness
    /// report for `run_id`. Never panics; every failure mode maps to a
    /// non-success status on the returned analysis.
    pub fn analyze(&self, record: &DataPoint, run_id: &str) -> ValidationAnalysis {
        let expected_failing = match record.fail_to_pass_tests() {
            Ok(tests) => tests,
            Err(e) => {
                return ValidationAnalysis::read_error(format!("invalid FAIL_TO_PASS list: {e}"))
            }
        };
        let expected_passing = match record.pass_to_pass_tests() {
            Ok(tests) => tests,
            Err(e) => {
                return ValidationAnalysis::read_error(format!("invalid PASS_TO_PASS list: {e}"))
            }
        };

        let report_path = self.report_path(run_id, &record.instance_id);
        if !report_path.exists() {
            warn!(path = %report_path.display(), "evaluation report not found");
            return ValidationAnalysis::not_found(&report_path);
        }

        let content = match std::fs::read_to_string(&report_path) {
            Ok(content) => content,
            Err(e) => {
                return ValidationAnalysis::read_error(format!(
                    "failed to read {}: {e}",
                    report_path.display()
                ))
            }
        };

        let report: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                return ValidationAnalysis::read_error(format!(
                    "failed to parse {}: {e}",
                    report_path.display()
                ))
            }
        };
        if !report.is_object() {
            return ValidationAnalysis::read_error(format!(
                "report {} is not a JSON object",
                report_path.display()
            ));
        }

        let instance_report = match report.get(&record.instance_id) {
            Some(entry) => match serde_json::from_value::<InstanceReport>(entry.clone()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return ValidationAnalysis::read_error(format!(
                        "malformed report entry for '{}': {e}",
                        record.instance_id
                    ))
                }
            },
            None => {
                debug!(instance_id = %record.instance_id, "instance missing from report");
                InstanceReport::default()
            }
        };

        let actual_failing = instance_report.tests_status.fail_to_pass.success;
        let actual_passing = instance_report.tests_status.pass_to_pass.success;

        let failing_tests_match = as_set(&expected_failing) == as_set(&actual_failing);
        let passing_tests_match = as_set(&expected_passing) == as_set(&actual_passing);
        let problem_resolved = instance_report.resolved;

        let validation_status = if failing_tests_match && passing_tests_match && problem_resolved {
            ValidationStatus::Success
        } else {
            ValidationStatus::TestMismatch
        };

        ValidationAnalysis {
            validation_status,
            problem_resolved,
            failing_tests_match,
            passing_tests_match,
            expected_failing_tests: expected_failing,
            actual_failing_tests: actual_failing,
            expected_passing_tests: expected_passing,
            actual_passing_tests: actual_passing,
            error: None,
        }
    }
}

fn as_set(names: &[String]) -> HashSet<&str> {
    names.iter().map(String::as_str).collect()
}
