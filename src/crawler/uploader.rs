//! Resource uploader
//!
//! Moves one resource from the site into the object store and records it in
//! the upload ledger. The ledger claim happens before any I/O so a URL is
//! handed to the store at most once, however many pages link to it.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::scheduler::RequestLimiter;
use crate::state::UploadLedger;
use crate::storage::ObjectStore;
use crate::url::{content_type_for, storage_key};
use crate::HarvestError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Uploads resources and keeps the ledger in step with the store
pub struct Uploader {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ObjectStore>,
    ledger: UploadLedger,
    limiter: RequestLimiter,
    uploaded: AtomicUsize,
    skipped: AtomicUsize,
}

impl Uploader {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn ObjectStore>, ledger: UploadLedger) -> Self {
        Self {
            fetcher,
            store,
            ledger,
            limiter: RequestLimiter::unbounded(),
            uploaded: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        }
    }

    /// Shares a request limiter with the uploader
    pub fn with_limiter(mut self, limiter: RequestLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn ledger(&self) -> &UploadLedger {
        &self.ledger
    }

    /// Uploads the resource at `resource_url` unless it is already in the ledger
    ///
    /// # Steps
    ///
    /// 1. Claim the URL in the ledger; return if it is already claimed
    /// 2. Derive the storage key from the final path segment
    /// 3. Fetch the resource bytes
    /// 4. Guess the content type from the URL
    /// 5. Put the object (an existing object with the same key is replaced)
    /// 6. Append the URL to the ledger file
    ///
    /// A failure in steps 2-5 releases the claim and is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The resource was uploaded
    /// * `Ok(false)` - The resource was already uploaded or in progress
    /// * `Err(HarvestError)` - Fetch, store or ledger failure
    pub async fn upload(&self, resource_url: &str) -> Result<bool, HarvestError> {
        if !self.ledger.claim(resource_url) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Already uploaded: {}", resource_url);
            return Ok(false);
        }

        let key = match self.transfer(resource_url).await {
            Ok(key) => key,
            Err(error) => {
                self.ledger.release(resource_url);
                tracing::error!("Failed to upload {}: {}", resource_url, error);
                return Err(error);
            }
        };

        self.ledger.commit(resource_url).await?;
        self.uploaded.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Uploaded {} as {}", resource_url, key);

        Ok(true)
    }

    /// Fetches the resource and writes it to the store, returning its key
    async fn transfer(&self, resource_url: &str) -> Result<String, HarvestError> {
        let key = storage_key(resource_url).map_err(|e| HarvestError::InvalidResource {
            url: resource_url.to_string(),
            reason: e.to_string(),
        })?;

        let body = {
            let _permit = self.limiter.acquire().await;
            self.fetcher.fetch_bytes(resource_url).await?
        };

        let content_type = content_type_for(resource_url);

        {
            let _permit = self.limiter.acquire().await;
            self.store.put(&key, body, &content_type).await?;
        }

        Ok(key)
    }

    /// Resources uploaded by this uploader
    pub fn uploaded(&self) -> usize {
        self.uploaded.load(Ordering::Relaxed)
    }

    /// Upload requests skipped because the URL was already in the ledger
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }
}
