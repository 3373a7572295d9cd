//! Benchmark data points: the on-disk record shape, integrity rules, and
//! directory loading.

pub mod loader;
pub mod types;

pub use loader::DatasetLoader;
pub use types::{parse_test_list, DataPoint, IntegrityError};
