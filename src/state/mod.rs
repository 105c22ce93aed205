//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `VisitedPaths`: page paths already fetched in this run (in memory only)
//! - `UploadLedger`: resource URLs already uploaded, persisted across runs as an
//!   append-only newline-delimited file

mod ledger;
mod visited;

// Re-export main types
pub use ledger::{read_ledger_entries, UploadLedger};
pub use visited::VisitedPaths;
