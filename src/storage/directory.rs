use crate::storage::traits::{check_key, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::path::PathBuf;

/// Stores objects as files in a local directory
///
/// The directory is created on first write. Content types are not persisted.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for DirectoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()> {
        check_key(key)?;

        let io_error = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.root).await.map_err(io_error)?;
        tokio::fs::write(self.root.join(key), &body)
            .await
            .map_err(io_error)?;

        tracing::debug!(
            "Wrote {} ({} bytes, {}) to {}",
            key,
            body.len(),
            content_type,
            self.root.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}
