//! Crawler module for page fetching and resource harvesting
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - HTML parsing and selector rule evaluation
//! - Concurrent branch scheduling under a failure policy
//! - Resource uploads recorded in the ledger
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod uploader;

pub use coordinator::{build_session, run_harvest, CrawlSession};
pub use fetcher::{build_http_client, user_agent_string, Fetcher, ReqwestFetcher};
pub use parser::{
    compile_selector, evaluate_rules, extract_links, Document, DocumentParser, Element, HtmlParser,
    MatchedLink,
};
pub use scheduler::{join_branches, BranchFailure, BranchOutcome, RequestLimiter};
pub use uploader::Uploader;
