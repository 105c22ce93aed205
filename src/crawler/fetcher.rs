//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building HTTP clients with proper user agent strings
//! - GET requests for page text and resource bytes
//! - Mapping transport failures and non-success statuses to errors
//!
//! There is no retry. A failed fetch is returned to the caller as is.

use crate::config::UserAgentConfig;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

/// Something that can GET a URL
///
/// The crawl engine and the uploader only talk to the network through this
/// trait.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a page and returns its body as text
    async fn fetch_text(&self, url: &str) -> Result<String, HarvestError>;

    /// Fetches a resource and returns its raw bytes
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, HarvestError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::UserAgentConfig;
/// use sumi_harvest::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// [`Fetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sends a GET and rejects non-success statuses
    async fn get(&self, url: &str) -> Result<Response, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| network_error(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, HarvestError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|source| network_error(url, source))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| network_error(url, source))?;
        Ok(bytes.to_vec())
    }
}

fn network_error(url: &str, source: reqwest::Error) -> HarvestError {
    if source.is_timeout() {
        tracing::debug!("Request timeout for {}", url);
    } else if source.is_connect() {
        tracing::debug!("Connection failed for {}", url);
    }

    HarvestError::Network {
        url: url.to_string(),
        source,
    }
}
