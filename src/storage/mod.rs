//! Storage module for harvested resources
//!
//! Uploaded resources go to an object store behind the [`ObjectStore`] trait:
//! - `DirectoryStore` writes files into a local directory
//! - `HttpStore` PUTs objects to a bucket endpoint
//! - `S3Store` writes to an S3-compatible bucket such as Cloudflare R2
//! - `MemoryStore` keeps objects in process

mod directory;
mod http;
mod memory;
mod s3;
mod traits;

pub use directory::DirectoryStore;
pub use http::HttpStore;
pub use memory::{MemoryStore, StoredObject};
pub use s3::S3Store;
pub use traits::{ObjectStore, StoreError, StoreResult};

use crate::config::{S3StoreConfig, StoreConfig};
use crate::{ConfigError, HarvestError};
use reqwest::Client;
use std::sync::Arc;

/// Opens the object store described by the configuration
///
/// # Arguments
///
/// * `config` - The store section of the configuration
/// * `client` - HTTP client reused by the `http` backend
///
/// # Returns
///
/// * `Ok(Arc<dyn ObjectStore>)` - The configured backend
/// * `Err(HarvestError)` - A referenced environment variable is missing
pub fn open_store(config: &StoreConfig, client: &Client) -> Result<Arc<dyn ObjectStore>, HarvestError> {
    match config {
        StoreConfig::Directory { root } => Ok(Arc::new(DirectoryStore::new(root))),
        StoreConfig::Http {
            endpoint,
            token_env,
        } => {
            let token = token_env.as_deref().map(env_var).transpose()?;
            Ok(Arc::new(HttpStore::new(client.clone(), endpoint, token)))
        }
        StoreConfig::S3(s3) => Ok(Arc::new(open_s3_store(s3)?)),
    }
}

/// Resolves S3 settings, reading unset values from the environment
fn open_s3_store(config: &S3StoreConfig) -> Result<S3Store, ConfigError> {
    let endpoint = match &config.endpoint {
        Some(endpoint) => endpoint.clone(),
        None => S3Store::r2_endpoint(&env_var(&config.account_id_env)?),
    };

    let bucket = match &config.bucket {
        Some(bucket) => bucket.clone(),
        None => env_var(&config.bucket_env)?,
    };

    Ok(S3Store::new(
        endpoint,
        config.region.clone(),
        bucket,
        env_var(&config.access_key_env)?,
        env_var(&config.secret_key_env)?,
    ))
}

fn env_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_directory_store() {
        let store = open_store(
            &StoreConfig::Directory {
                root: "./harvest".to_string(),
            },
            &Client::new(),
        )
        .unwrap();
        assert_eq!(store.describe(), "directory ./harvest");
    }

    #[test]
    fn test_open_http_store_requires_token_env() {
        let result = open_store(
            &StoreConfig::Http {
                endpoint: "https://bucket.example.com".to_string(),
                token_env: Some("SUMI_HARVEST_TEST_TOKEN_THAT_IS_NEVER_SET".to_string()),
            },
            &Client::new(),
        );
        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::MissingEnv(_)))
        ));
    }

    #[tokio::test]
    async fn test_open_s3_store_from_env() {
        std::env::set_var("SUMI_HARVEST_TEST_S3_ACCOUNT", "0123abcd");
        std::env::set_var("SUMI_HARVEST_TEST_S3_BUCKET", "cover-art");
        std::env::set_var("SUMI_HARVEST_TEST_S3_KEY", "AKIDEXAMPLE");
        std::env::set_var("SUMI_HARVEST_TEST_S3_SECRET", "secret");

        let config = StoreConfig::S3(S3StoreConfig {
            account_id_env: "SUMI_HARVEST_TEST_S3_ACCOUNT".to_string(),
            bucket_env: "SUMI_HARVEST_TEST_S3_BUCKET".to_string(),
            access_key_env: "SUMI_HARVEST_TEST_S3_KEY".to_string(),
            secret_key_env: "SUMI_HARVEST_TEST_S3_SECRET".to_string(),
            ..S3StoreConfig::default()
        });

        let store = open_store(&config, &Client::new()).unwrap();
        assert_eq!(
            store.describe(),
            "s3 bucket cover-art at https://0123abcd.r2.cloudflarestorage.com"
        );
    }

    #[test]
    fn test_open_s3_store_missing_credentials() {
        let config = StoreConfig::S3(S3StoreConfig {
            endpoint: Some("https://s3.example.com".to_string()),
            bucket: Some("cover-art".to_string()),
            access_key_env: "SUMI_HARVEST_TEST_S3_KEY_THAT_IS_NEVER_SET".to_string(),
            ..S3StoreConfig::default()
        });

        let result = open_store(&config, &Client::new());
        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::MissingEnv(name)))
                if name == "SUMI_HARVEST_TEST_S3_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
