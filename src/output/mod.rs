//! Output module for harvest reports
//!
//! This module handles:
//! - Collecting the outcome of a run into a [`CrawlReport`]
//! - Rendering the report for the terminal

mod report;

pub use report::{format_report, print_report, CrawlReport};
