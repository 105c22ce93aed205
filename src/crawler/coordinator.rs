//! Crawl coordinator - the recursive harvest engine
//!
//! A [`CrawlSession`] owns all state of one run: the origin, the selector
//! rules, the visited set, the uploader with its ledger, and the collaborators
//! it fetches, parses and stores through. Each page is crawled by
//! [`CrawlSession::crawl_page`], which:
//! - skips pages already visited or already uploaded as resources
//! - fetches and parses the page
//! - uploads every Download match, in rule and document order
//! - crawls every new Recurse match concurrently and waits for all of them

use crate::config::{Config, FailurePolicy, LinkMode, SelectorRule};
use crate::crawler::fetcher::{build_http_client, Fetcher, ReqwestFetcher};
use crate::crawler::parser::{extract_links, DocumentParser, HtmlParser};
use crate::crawler::scheduler::{join_branches, BranchFailure, RequestLimiter};
use crate::crawler::uploader::Uploader;
use crate::output::CrawlReport;
use crate::state::{UploadLedger, VisitedPaths};
use crate::storage::open_store;
use crate::url::{path_on_origin, resolve_href, PageRef};
use crate::{ConfigError, HarvestError};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// State and collaborators of one harvest run
pub struct CrawlSession {
    origin: String,
    rules: Vec<SelectorRule>,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn DocumentParser>,
    uploader: Uploader,
    visited: VisitedPaths,
    limiter: RequestLimiter,
    policy: FailurePolicy,
    pages_fetched: AtomicUsize,
    failures: Mutex<Vec<BranchFailure>>,
}

impl CrawlSession {
    /// Creates a session for `origin`
    ///
    /// Every rule pattern is checked against the parser up front so a bad
    /// selector fails the run before any request is made.
    ///
    /// # Arguments
    ///
    /// * `origin` - Scheme, host and port shared by every crawled page
    /// * `rules` - Selector rules, evaluated in order on every page
    /// * `fetcher` - Used for page fetches (the uploader has its own handle)
    /// * `parser` - Turns page bodies into queryable documents
    /// * `uploader` - Uploads Download matches
    pub fn new(
        origin: impl Into<String>,
        rules: Vec<SelectorRule>,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn DocumentParser>,
        uploader: Uploader,
    ) -> Result<Self, HarvestError> {
        for rule in &rules {
            parser
                .check_pattern(&rule.pattern)
                .map_err(|message| ConfigError::InvalidSelector {
                    pattern: rule.pattern.clone(),
                    message,
                })?;
        }

        Ok(Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            rules,
            fetcher,
            parser,
            uploader,
            visited: VisitedPaths::new(),
            limiter: RequestLimiter::unbounded(),
            policy: FailurePolicy::default(),
            pages_fetched: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        })
    }

    /// Bounds in-flight network operations for pages and uploads alike
    pub fn with_limiter(mut self, limiter: RequestLimiter) -> Self {
        self.uploader = self.uploader.with_limiter(limiter.clone());
        self.limiter = limiter;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Crawls from `path` until no new pages are reachable
    ///
    /// Under `FailFast` the first error ends the run and is returned. Under
    /// `Isolate` failures are collected in the report, and the run still
    /// returns `Ok`.
    pub async fn run(self: Arc<Self>, path: &str) -> Result<CrawlReport, HarvestError> {
        let started_at = Utc::now();
        tracing::info!("Starting harvest at {}{}", self.origin, path);

        if let Err(error) = Arc::clone(&self).crawl_page(path.to_string()).await {
            match self.policy {
                FailurePolicy::FailFast => {
                    tracing::error!("Harvest failed: {}", error);
                    return Err(error);
                }
                FailurePolicy::Isolate => self.record_failure(BranchFailure {
                    target: path.to_string(),
                    error: error.to_string(),
                }),
            }
        }

        let report = self.report(started_at);
        tracing::info!(
            "Harvest finished: {} pages, {} uploads, {} failures",
            report.pages_fetched,
            report.uploads,
            report.failures.len()
        );
        Ok(report)
    }

    /// Crawls one page and, transitively, everything it leads to
    ///
    /// # Steps
    ///
    /// 1. Return if `path` was already visited, or if `origin + path` is in
    ///    the upload ledger
    /// 2. Mark `path` visited, then fetch it
    /// 3. Parse the body and evaluate the selector rules
    /// 4. Upload Download matches one after another; collect Recurse matches
    ///    that are not yet visited, dropping duplicates
    /// 5. Crawl the collected pages concurrently and wait for all of them
    ///
    /// Fetch, parse and upload errors end this branch and are returned.
    pub fn crawl_page(self: Arc<Self>, path: String) -> BoxFuture<'static, Result<(), HarvestError>> {
        async move {
            let url = format!("{}{}", self.origin, path);

            if self.uploader.ledger().contains(&url) {
                tracing::debug!("Skipping {}: already uploaded as a resource", url);
                return Ok(());
            }

            if !self.visited.insert(&path) {
                tracing::debug!("Skipping {}: already visited", url);
                return Ok(());
            }

            let body = {
                let _permit = self.limiter.acquire().await;
                self.fetcher.fetch_text(&url).await.map_err(|error| {
                    tracing::error!("Failed to fetch {}: {}", url, error);
                    error
                })?
            };
            self.pages_fetched.fetch_add(1, Ordering::Relaxed);
            tracing::info!("Fetched {}", url);

            let links = extract_links(self.parser.as_ref(), &body, &self.rules).map_err(|message| {
                tracing::error!("Failed to parse {}: {}", url, message);
                HarvestError::Parse {
                    url: url.clone(),
                    message,
                }
            })?;

            let mut candidates = Vec::new();
            let mut seen = HashSet::new();

            for link in links {
                let Some(target) = resolve_href(&self.origin, &url, &link.href) else {
                    tracing::debug!("Ignoring href {:?} on {}", link.href, url);
                    continue;
                };

                match link.mode {
                    LinkMode::Download => {
                        self.uploader.upload(&target).await?;
                    }
                    LinkMode::Recurse => {
                        let Some(child) = path_on_origin(&self.origin, &target) else {
                            tracing::warn!("Not following {}: outside {}", target, self.origin);
                            continue;
                        };

                        if !self.visited.contains(&child) && seen.insert(child.clone()) {
                            candidates.push(child);
                        }
                    }
                }
            }

            self.crawl_children(candidates).await
        }
        .boxed()
    }

    /// Spawns one branch per child page and joins them under the failure policy
    async fn crawl_children(self: &Arc<Self>, children: Vec<String>) -> Result<(), HarvestError> {
        if children.is_empty() {
            return Ok(());
        }

        tracing::debug!("Following {} page(s)", children.len());

        let mut branches = JoinSet::new();
        for child in children {
            let session = Arc::clone(self);
            branches.spawn(async move {
                let result = session.crawl_page(child.clone()).await;
                (child, result)
            });
        }

        join_branches(branches, self.policy, |failure| self.record_failure(failure)).await
    }

    fn record_failure(&self, failure: BranchFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    /// Snapshot of the run so far
    pub fn report(&self, started_at: chrono::DateTime<Utc>) -> CrawlReport {
        CrawlReport {
            origin: self.origin.clone(),
            started_at,
            finished_at: Utc::now(),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            uploads: self.uploader.uploaded(),
            uploads_skipped: self.uploader.skipped(),
            failures: self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Builds a session and the seed page from the configuration
///
/// Opens the upload ledger (creating it if missing), builds the HTTP client,
/// and opens the configured object store.
pub async fn build_session(config: &Config) -> Result<(Arc<CrawlSession>, PageRef), HarvestError> {
    let seed = PageRef::from_seed(&config.crawler.seed)?;

    let client = build_http_client(&config.user_agent)?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(client.clone()));
    let store = open_store(&config.store, &client)?;
    let ledger = UploadLedger::open(&config.ledger.path).await?;

    tracing::info!(
        "Ledger {} holds {} uploaded resources; storing to {}",
        config.ledger.path,
        ledger.len(),
        store.describe()
    );

    let uploader = Uploader::new(Arc::clone(&fetcher), store, ledger);
    let session = CrawlSession::new(
        seed.origin.clone(),
        config.selectors.clone(),
        fetcher,
        Arc::new(HtmlParser),
        uploader,
    )?
    .with_limiter(RequestLimiter::new(config.crawler.max_concurrent_requests))
    .with_failure_policy(config.crawler.failure_policy);

    Ok((Arc::new(session), seed))
}

/// Runs the main harvest operation
///
/// This function orchestrates the entire run:
///
/// 1. Split the seed into origin and path
/// 2. Open the upload ledger and the object store
/// 3. Build the HTTP client
/// 4. Crawl from the seed until no new pages are reachable
/// 5. Return a report of what was fetched, uploaded and what failed
///
/// # Arguments
///
/// * `config` - The harvest configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished (possibly with isolated failures)
/// * `Err(HarvestError)` - The run was aborted
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::load_config;
/// use sumi_harvest::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let report = run_harvest(&config).await?;
/// println!("{} uploads", report.uploads);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: &Config) -> Result<CrawlReport, HarvestError> {
    let (session, seed) = build_session(config).await?;
    tracing::debug!("Seed page: {}", seed.url());
    session.run(&seed.path).await
}
