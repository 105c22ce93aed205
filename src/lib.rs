//! Sumi-Harvest: a selector-driven site harvester
//!
//! This crate crawls a single site by following links picked out by CSS selector
//! rules, uploads the resources those rules mark for download to an object store,
//! and keeps an append-only ledger so nothing is uploaded twice across runs.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Ledger error for {path}: {source}")]
    Ledger {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot upload {url}: {reason}")]
    InvalidResource { url: String, reason: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl branch did not finish: {0}")]
    Task(String),

    #[error("{0} crawl branch(es) failed")]
    BranchFailures(usize),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{pattern}': {message}")]
    InvalidSelector { pattern: String, message: String },

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, FailurePolicy, LinkMode, SelectorRule};
pub use crawler::{CrawlSession, Uploader};
pub use output::CrawlReport;
pub use crate::url::PageRef;
