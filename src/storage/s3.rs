use crate::storage::traits::{check_key, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

/// Stores objects in an S3-compatible bucket with `PutObject`
///
/// Requests are signed with static credentials and use path-style addressing
/// (`{endpoint}/{bucket}/{key}`), which Cloudflare R2 and most S3 gateways
/// accept.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl S3Store {
    /// Creates a store for `bucket` at `endpoint`
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Bucket endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    /// * `region` - Signing region (`auto` for R2)
    /// * `bucket` - Bucket name
    /// * `access_key_id` - Access key ID
    /// * `secret_access_key` - Secret access key
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "sumi-harvest");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint.clone())
            .region(Region::new(region.into()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(config),
            endpoint,
            bucket: bucket.into(),
        }
    }

    /// R2 endpoint for a Cloudflare account
    pub fn r2_endpoint(account_id: &str) -> String {
        format!("https://{}.r2.cloudflarestorage.com", account_id)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()> {
        check_key(key)?;

        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StoreError::S3 {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!("Put {} ({} bytes, {}) into {}", key, size, content_type, self.bucket);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3 bucket {} at {}", self.bucket, self.endpoint)
    }
}
