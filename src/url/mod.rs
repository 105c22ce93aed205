//! URL handling module for Sumi-Harvest
//!
//! A harvest runs against a single origin. Pages are tracked by their path
//! (path plus query), resources by their absolute URL. This module provides
//! the seed split into origin and path, href resolution, and the storage key
//! and content type derived from a resource URL.

mod key;
mod resolve;

// Re-export main functions
pub use key::{content_type_for, storage_key};
pub use resolve::{path_on_origin, resolve_href};

use crate::{UrlError, UrlResult};
use std::hash::{Hash, Hasher};
use url::Url;

/// A page on the crawl origin
///
/// Two `PageRef`s are equal when their paths are equal; the origin is fixed for
/// a whole run.
#[derive(Debug, Clone)]
pub struct PageRef {
    /// Scheme, host and port, without a trailing slash
    pub origin: String,

    /// Path plus query string, always starting with `/`
    pub path: String,
}

impl PageRef {
    /// Splits an absolute seed URL into its origin and path
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_harvest::url::PageRef;
    ///
    /// let seed = PageRef::from_seed("https://vaporwave.wiki/index.php?title=Category:Cover_Art").unwrap();
    /// assert_eq!(seed.origin, "https://vaporwave.wiki");
    /// assert_eq!(seed.path, "/index.php?title=Category:Cover_Art");
    /// ```
    pub fn from_seed(seed: &str) -> UrlResult<Self> {
        let url = Url::parse(seed).map_err(|e| UrlError::Parse(e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        if url.host_str().is_none() {
            return Err(UrlError::MissingHost);
        }

        let origin = url.origin().ascii_serialization();
        let mut path = url.path().to_string();
        if let Some(query) = url.query().filter(|q| !q.is_empty()) {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self { origin, path })
    }

    /// The absolute URL of this page
    pub fn url(&self) -> String {
        format!("{}{}", self.origin, self.path)
    }
}

impl PartialEq for PageRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for PageRef {}

impl Hash for PageRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}
