//! Run report
//!
//! The crawl engine fills a [`CrawlReport`] at the end of every run. Failed
//! branches only appear here when the run uses the isolate policy; a fail-fast
//! run that hits an error returns the error instead of a report.

use crate::crawler::BranchFailure;
use chrono::{DateTime, Utc};

/// Outcome of one harvest run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Origin every page was fetched from
    pub origin: String,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Pages fetched and parsed
    pub pages_fetched: usize,

    /// Resources uploaded during this run
    pub uploads: usize,

    /// Download links skipped because the resource was already in the ledger
    pub uploads_skipped: usize,

    /// Branches that failed under the isolate policy
    pub failures: Vec<BranchFailure>,
}

impl CrawlReport {
    /// True when no branch failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Wall-clock duration in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Formats a report as plain text
///
/// # Arguments
///
/// * `report` - The run report
///
/// # Returns
///
/// A multi-line summary, ending with one line per failed branch
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();

    out.push_str("=== Harvest Report ===\n\n");
    out.push_str(&format!("Origin: {}\n", report.origin));
    out.push_str(&format!("Started: {}\n", report.started_at.to_rfc3339()));
    out.push_str(&format!("Finished: {}\n", report.finished_at.to_rfc3339()));
    out.push_str(&format!("Duration: {} seconds\n\n", report.duration_seconds()));

    out.push_str(&format!("Pages fetched: {}\n", report.pages_fetched));
    out.push_str(&format!("Resources uploaded: {}\n", report.uploads));
    out.push_str(&format!("Already uploaded: {}\n", report.uploads_skipped));

    if report.is_success() {
        out.push_str("\nStatus: complete\n");
    } else {
        out.push_str(&format!("\nFailed branches ({}):\n", report.failures.len()));
        for failure in &report.failures {
            out.push_str(&format!("  - {}: {}\n", failure.target, failure.error));
        }
    }

    out
}

/// Prints a report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}
