//! Command-line entrypoint for the data point validator.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use datapoint_validator::{
    print_batch_error, print_summary, DataPointValidator, HarnessConfig, ValidatorConfig,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dpv")]
#[command(about = "SWE-bench data points validator")]
struct Args {
    /// Directory containing data point JSON files
    #[arg(long, default_value = "data_points", env = "DPV_DATA_DIR")]
    data_dir: PathBuf,

    /// Specific data point files to validate (all files when omitted)
    #[arg(long, num_args = 1..)]
    files: Option<Vec<String>>,

    /// Model label recorded on predictions and report paths
    #[arg(long, default_value = "gpt-4", env = "DPV_MODEL")]
    model: String,

    /// Number of data points to evaluate concurrently
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Harness evaluation timeout per data point, in seconds
    #[arg(long, default_value_t = 1800)]
    timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut filter = EnvFilter::from_default_env().add_directive("info".parse().unwrap());
    if args.verbose {
        filter = filter.add_directive("datapoint_validator=debug".parse().unwrap());
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting SWE-bench data point validation");
    info!("  Data dir: {}", args.data_dir.display());
    info!("  Model: {}", args.model);
    info!("  Jobs: {}", args.jobs);

    let config = ValidatorConfig {
        data_dir: args.data_dir,
        model: args.model,
        concurrency: args.jobs,
        harness: HarnessConfig {
            timeout: Duration::from_secs(args.timeout_secs),
            ..HarnessConfig::default()
        },
        ..ValidatorConfig::default()
    };

    let validator = DataPointValidator::new(config);
    let code = match validator.run(args.files).await {
        Ok(summary) => {
            print_summary(&summary);
            if summary.success_percentage >= 100.0 {
                0
            } else {
                1
            }
        }
        Err(e) => {
            error!("validation run failed: {:#}", e);
            print_batch_error(&e);
            1
        }
    };
    std::process::exit(code);
}
