use crate::config::types::{
    Config, CrawlerConfig, LedgerConfig, S3StoreConfig, SelectorRule, StoreConfig,
    UserAgentConfig,
};
use crate::crawler::compile_selector;
use crate::ConfigError;
use url::Url;

/// Upper bound accepted for `max-concurrent-requests`
const MAX_CONCURRENT_REQUESTS: u32 = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_ledger_config(&config.ledger)?;
    validate_store_config(&config.store)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("seed", &config.seed)?;

    if let Some(limit) = config.max_concurrent_requests {
        if limit < 1 || limit > MAX_CONCURRENT_REQUESTS {
            return Err(ConfigError::Validation(format!(
                "max_concurrent_requests must be between 1 and {}, got {}",
                MAX_CONCURRENT_REQUESTS, limit
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates ledger configuration
fn validate_ledger_config(config: &LedgerConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "ledger path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the object store backend
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    match config {
        StoreConfig::Directory { root } => {
            if root.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "directory store root cannot be empty".to_string(),
                ));
            }
        }
        StoreConfig::Http {
            endpoint,
            token_env,
        } => {
            validate_http_url("store endpoint", endpoint)?;

            if matches!(token_env, Some(name) if name.trim().is_empty()) {
                return Err(ConfigError::Validation(
                    "token-env cannot be empty when set".to_string(),
                ));
            }
        }
        StoreConfig::S3(s3) => validate_s3_config(s3)?,
    }

    Ok(())
}

/// Validates S3 bucket settings
fn validate_s3_config(config: &S3StoreConfig) -> Result<(), ConfigError> {
    if let Some(endpoint) = &config.endpoint {
        validate_http_url("s3 endpoint", endpoint)?;
    }

    if matches!(&config.bucket, Some(bucket) if bucket.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "s3 bucket cannot be empty when set".to_string(),
        ));
    }

    if config.region.trim().is_empty() {
        return Err(ConfigError::Validation(
            "s3 region cannot be empty".to_string(),
        ));
    }

    for (field, name) in [
        ("account-id-env", &config.account_id_env),
        ("bucket-env", &config.bucket_env),
        ("access-key-env", &config.access_key_env),
        ("secret-key-env", &config.secret_key_env),
    ] {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "s3 {} cannot be empty",
                field
            )));
        }
    }

    Ok(())
}

/// Validates selector rules
///
/// Every pattern must compile; a text filter, when present, must not be empty.
fn validate_selectors(rules: &[SelectorRule]) -> Result<(), ConfigError> {
    if rules.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[selector]] rule is required".to_string(),
        ));
    }

    for rule in rules {
        compile_selector(&rule.pattern).map_err(|message| ConfigError::InvalidSelector {
            pattern: rule.pattern.clone(),
            message,
        })?;

        if matches!(&rule.text, Some(text) if text.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "selector '{}' has an empty text filter",
                rule.pattern
            )));
        }

        if rule.attribute.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' has an empty attribute name",
                rule.pattern
            )));
        }
    }

    Ok(())
}

/// Validates that `value` is an absolute http(s) URL with a host
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
