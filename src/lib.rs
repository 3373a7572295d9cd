//! SWE-bench data point validation pipeline.
//!
//! Benchmark data points reference a patch and two test lists. This crate
//! replays each patch through the evaluation harness and checks the produced
//! report against the record's expectations.
//!
//! ## Module Structure
//!
//! - `dataset/`: On-disk record shape, integrity rules, directory loading
//! - `predictions`: Prediction entries and JSONL serialization
//! - `harness`: Evaluation harness subprocess supervision
//! - `report`: Harness report lookup and reconciliation
//! - `validator`: Per-record pipeline and batch aggregation
//! - `summary`: Console reporting

pub mod dataset;
pub mod harness;
pub mod predictions;
pub mod report;
pub mod summary;
pub mod validator;

pub use dataset::{parse_test_list, DataPoint, DatasetLoader, IntegrityError};
pub use harness::{HarnessConfig, HarnessError, HarnessRunner};
pub use predictions::{ConversionStats, PredictionEntry, PredictionFormatter};
pub use report::{ResultAnalyzer, ValidationAnalysis, ValidationStatus};
pub use summary::{print_batch_error, print_summary};
pub use validator::{DataPointValidator, RecordOutcome, ValidationSummary, ValidatorConfig};
