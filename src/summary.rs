//! Human-readable console report for a finished validation batch.

use crate::report::ValidationStatus;
use crate::validator::ValidationSummary;

fn print_banner() {
    println!("\n{}", "=".repeat(70));
    println!("SWE-BENCH DATA VALIDATION REPORT");
    println!("{}", "=".repeat(70));
}

/// Print the batch summary: totals, one line per data point, and a closing
/// verdict line.
pub fn print_summary(summary: &ValidationSummary) {
    print_banner();

    println!("\nTotal data points: {}", summary.total_processed);
    println!("Successful:        {}", summary.success_count);
    println!("With errors:       {}", summary.error_count);
    println!("Success rate:      {:.1}%", summary.success_percentage);

    println!("\nDetailed results:");
    for (name, outcome) in &summary.individual_results {
        let instance = outcome.instance_id.as_deref().unwrap_or("unknown");
        match outcome.status {
            ValidationStatus::Success => {
                println!("  ✓ {name} ({instance}): all tests passed");
            }
            ValidationStatus::TestMismatch => {
                println!("  ✗ {name} ({instance}): test results diverge from expectations");
            }
            ValidationStatus::ReportNotFound => {
                println!("  ✗ {name} ({instance}): evaluation report not found");
            }
            ValidationStatus::ReadError => {
                println!("  ✗ {name} ({instance}): evaluation report unreadable");
            }
            _ => {
                let error = outcome.error.as_deref().unwrap_or("unknown error");
                println!("  ✗ {name}: {error}");
            }
        }
    }

    println!("\n{}", closing_line(summary.success_percentage));
    println!("{}", "=".repeat(70));
}

/// Print a batch-level failure, for runs that never produced a summary.
pub fn print_batch_error(error: &anyhow::Error) {
    print_banner();
    println!("\nValidation did not run: {error:#}");
    println!("{}", "=".repeat(70));
}

/// One-line verdict for the given success percentage.
pub fn closing_line(success_percentage: f64) -> &'static str {
    if success_percentage >= 100.0 {
        "All data points passed validation"
    } else if success_percentage >= 80.0 {
        "Most data points passed validation"
    } else if success_percentage >= 50.0 {
        "About half of the data points passed validation"
    } else {
        "Most data points failed validation"
    }
}
