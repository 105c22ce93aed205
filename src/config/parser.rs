use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("{} selector rules", config.selectors.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup so runs sharing a ledger can be told apart.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load or parse the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FailurePolicy, LinkMode, StoreConfig};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[crawler]
seed = "https://vaporwave.wiki/index.php?title=Category:Cover_Art"
max-concurrent-requests = 8

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[ledger]
path = "./uploaded_files.txt"

[store]
kind = "directory"
root = "./harvest"

[[selector]]
pattern = "a.mw-file-description"
mode = "recurse"

[[selector]]
pattern = ".fullImageLink a"
mode = "download"

[[selector]]
pattern = 'a[title="Category:Cover Art"]'
mode = "recurse"
text = "next page"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_concurrent_requests, Some(8));
        assert_eq!(config.crawler.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.user_agent.crawler_name, "TestHarvester");
        assert_eq!(
            config.store,
            StoreConfig::Directory {
                root: "./harvest".to_string()
            }
        );
        assert_eq!(config.selectors.len(), 3);
        assert_eq!(config.selectors[1].mode, LinkMode::Download);
        assert_eq!(config.selectors[2].text.as_deref(), Some("next page"));
        assert_eq!(config.selectors[0].attribute, "href");
    }

    #[test]
    fn test_load_http_store_and_isolate_policy() {
        let content = VALID_CONFIG
            .replace("max-concurrent-requests = 8", "failure-policy = \"isolate\"")
            .replace(
                "kind = \"directory\"\nroot = \"./harvest\"",
                "kind = \"http\"\nendpoint = \"https://bucket.example.com\"\ntoken-env = \"STORE_TOKEN\"",
            );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.crawler.max_concurrent_requests, None);
        assert_eq!(
            config.store,
            StoreConfig::Http {
                endpoint: "https://bucket.example.com".to_string(),
                token_env: Some("STORE_TOKEN".to_string()),
            }
        );
    }

    #[test]
    fn test_load_s3_store_defaults() {
        let content = VALID_CONFIG.replace(
            "kind = \"directory\"\nroot = \"./harvest\"",
            "kind = \"s3\"\nbucket = \"cover-art\"",
        );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        let StoreConfig::S3(s3) = config.store else {
            panic!("expected s3 store, got {:?}", config.store);
        };
        assert_eq!(s3.bucket.as_deref(), Some("cover-art"));
        assert_eq!(s3.endpoint, None);
        assert_eq!(s3.region, "auto");
        assert_eq!(s3.account_id_env, "CLOUDFLARE_ACCOUNT_ID");
        assert_eq!(s3.bucket_env, "R2_BUCKET");
        assert_eq!(s3.access_key_env, "ACCESS_KEY_ID");
        assert_eq!(s3.secret_key_env, "ACCESS_SECRET_KEY");
    }

    #[test]
    fn test_load_s3_store_overrides() {
        let content = VALID_CONFIG.replace(
            "kind = \"directory\"\nroot = \"./harvest\"",
            "kind = \"s3\"\nendpoint = \"https://s3.eu-west-1.amazonaws.com\"\nregion = \"eu-west-1\"\n\
             bucket-env = \"COVERS_BUCKET\"\naccess-key-env = \"AWS_ACCESS_KEY_ID\"\n\
             secret-key-env = \"AWS_SECRET_ACCESS_KEY\"",
        );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        let StoreConfig::S3(s3) = config.store else {
            panic!("expected s3 store, got {:?}", config.store);
        };
        assert_eq!(s3.endpoint.as_deref(), Some("https://s3.eu-west-1.amazonaws.com"));
        assert_eq!(s3.region, "eu-west-1");
        assert_eq!(s3.bucket, None);
        assert_eq!(s3.bucket_env, "COVERS_BUCKET");
        assert_eq!(s3.access_key_env, "AWS_ACCESS_KEY_ID");
        assert_eq!(s3.secret_key_env, "AWS_SECRET_ACCESS_KEY");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace("max-concurrent-requests = 8", "max-concurrent-requests = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_config_with_bad_selector() {
        let content = VALID_CONFIG.replace("a.mw-file-description", "a[[broken");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidSelector { .. }
        ));
    }

    #[test]
    fn test_compute_config_hash() {
        let config_content = "test content";
        let file = create_temp_config(config_content);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
