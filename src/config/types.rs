use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub ledger: LedgerConfig,
    pub store: StoreConfig,
    #[serde(default, rename = "selector")]
    pub selectors: Vec<SelectorRule>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Absolute URL the harvest starts from
    pub seed: String,

    /// Upper bound on in-flight network operations (unbounded when absent)
    #[serde(rename = "max-concurrent-requests", default)]
    pub max_concurrent_requests: Option<u32>,

    /// What happens to sibling branches when one branch fails
    #[serde(rename = "failure-policy", default)]
    pub failure_policy: FailurePolicy,
}

/// How the failure of one crawl branch affects the others
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first failure cancels all in-flight work and ends the run
    #[default]
    FailFast,

    /// Failures are recorded and sibling branches keep going
    Isolate,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Upload ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Path to the newline-delimited list of uploaded resource URLs
    pub path: String,
}

/// Object store backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StoreConfig {
    /// Objects are written as files under `root`
    Directory { root: String },

    /// Objects are sent with `PUT {endpoint}/{key}`
    Http {
        endpoint: String,
        /// Name of the environment variable holding a bearer token
        #[serde(rename = "token-env", default)]
        token_env: Option<String>,
    },

    /// Objects are written with S3 `PutObject`, for example to Cloudflare R2
    S3(S3StoreConfig),
}

/// S3-compatible bucket settings
///
/// Values that are usually secret are read from environment variables (a
/// `.env` file is loaded first), under the names given here. Without an
/// explicit `endpoint`, the Cloudflare R2 endpoint for the account in
/// `account-id-env` is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct S3StoreConfig {
    /// Bucket endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_account_id_env")]
    pub account_id_env: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket name; read from `bucket-env` when absent
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default = "default_bucket_env")]
    pub bucket_env: String,

    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,

    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            account_id_env: default_account_id_env(),
            region: default_region(),
            bucket: None,
            bucket_env: default_bucket_env(),
            access_key_env: default_access_key_env(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

fn default_account_id_env() -> String {
    "CLOUDFLARE_ACCOUNT_ID".to_string()
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_bucket_env() -> String {
    "R2_BUCKET".to_string()
}

fn default_access_key_env() -> String {
    "ACCESS_KEY_ID".to_string()
}

fn default_secret_key_env() -> String {
    "ACCESS_SECRET_KEY".to_string()
}

/// A selector rule: which elements to pick and what to do with their links
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectorRule {
    /// CSS selector expression
    pub pattern: String,

    /// Whether matched links are crawled or uploaded
    pub mode: LinkMode,

    /// Only elements whose text equals this are used
    #[serde(default)]
    pub text: Option<String>,

    /// Attribute holding the link
    #[serde(default = "default_link_attribute")]
    pub attribute: String,
}

fn default_link_attribute() -> String {
    "href".to_string()
}

impl SelectorRule {
    /// A rule whose matches are crawled as further pages
    pub fn recurse(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: LinkMode::Recurse,
            text: None,
            attribute: default_link_attribute(),
        }
    }

    /// A rule whose matches are uploaded to the object store
    pub fn download(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: LinkMode::Download,
            text: None,
            attribute: default_link_attribute(),
        }
    }

    /// Restricts the rule to elements with exactly this text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Reads links from `attribute` instead of `href`
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }
}

/// What a selector rule does with the links it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMode {
    /// Crawl the link as another page on the origin
    Recurse,

    /// Upload the linked resource
    Download,
}
