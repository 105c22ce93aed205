use crate::storage::traits::{check_key, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

/// Stores objects with plain HTTP `PUT {endpoint}/{key}` requests
///
/// Works against any bucket gateway that accepts unsigned PUTs, optionally
/// authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(client: Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            client,
            endpoint,
            token,
        }
    }

    /// The URL an object with `key` is written to
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, urlencoding::encode(key))
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()> {
        check_key(key)?;

        let mut request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(body);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| StoreError::Http {
            key: key.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("http {}", self.endpoint)
    }
}
