//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest site harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config_with_hash, validate, Config, FailurePolicy, StoreConfig};
use sumi_harvest::crawler::run_harvest;
use sumi_harvest::output::print_report;
use sumi_harvest::state::read_ledger_entries;
use sumi_harvest::{HarvestError, PageRef};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a selector-driven site harvester
///
/// Sumi-Harvest crawls one site by following the links its selector rules pick
/// out, uploads the resources those rules mark for download, and records every
/// upload in a ledger so later runs skip them.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A selector-driven site harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from this URL instead of the configured seed
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Keep crawling sibling pages when one branch fails
    #[arg(long)]
    isolate_failures: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Store credentials may live in a .env file
    dotenvy::dotenv().ok();

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config).await
    } else {
        handle_harvest(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(seed) = &cli.seed {
        tracing::info!("Overriding seed with {}", seed);
        config.crawler.seed = seed.clone();
    }

    if cli.isolate_failures {
        config.crawler.failure_policy = FailurePolicy::Isolate;
    }

    validate(config).context("invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: shows what would be harvested
async fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let seed = PageRef::from_seed(&config.crawler.seed)?;
    let ledger = read_ledger_entries(&config.ledger.path).await?;

    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawl:");
    println!("  Origin: {}", seed.origin);
    println!("  Start path: {}", seed.path);
    match config.crawler.max_concurrent_requests {
        Some(max) => println!("  Max concurrent requests: {}", max),
        None => println!("  Max concurrent requests: unbounded"),
    }
    println!("  Failure policy: {:?}", config.crawler.failure_policy);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nSelector Rules ({}):", config.selectors.len());
    for rule in &config.selectors {
        match &rule.text {
            Some(text) => println!("  - [{:?}] {} (text = {:?})", rule.mode, rule.pattern, text),
            None => println!("  - [{:?}] {}", rule.mode, rule.pattern),
        }
    }

    println!("\nLedger:");
    println!("  Path: {}", config.ledger.path);
    println!("  Uploaded resources: {}", ledger.len());

    println!("\nStore:");
    match &config.store {
        StoreConfig::Directory { root } => println!("  Directory: {}", root),
        StoreConfig::Http { endpoint, token_env } => {
            println!("  Endpoint: {}", endpoint);
            if let Some(var) = token_env {
                println!("  Token from: ${}", var);
            }
        }
        StoreConfig::S3(s3) => {
            match &s3.endpoint {
                Some(endpoint) => println!("  S3 endpoint: {}", endpoint),
                None => println!("  S3 endpoint: R2 account from ${}", s3.account_id_env),
            }
            match &s3.bucket {
                Some(bucket) => println!("  Bucket: {}", bucket),
                None => println!("  Bucket from: ${}", s3.bucket_env),
            }
            println!("  Region: {}", s3.region);
            println!(
                "  Credentials from: ${} / ${}",
                s3.access_key_env, s3.secret_key_env
            );
        }
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} with {} selector rules",
        config.crawler.seed,
        config.selectors.len()
    );

    let report = run_harvest(config).await.context("harvest aborted")?;
    print_report(&report);

    if !report.is_success() {
        let error = HarvestError::BranchFailures(report.failures.len());
        tracing::error!("Harvest finished with failures: {}", error);
        return Err(error.into());
    }

    tracing::info!("Harvest completed successfully");
    Ok(())
}
