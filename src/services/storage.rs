use anyhow::Result;
use async_trait::async_trait;

/// Narrow seam to the external object storage holding file contents.
///
/// The service never reads or writes objects; it only needs to remove the
/// object behind a file's storage URL once the file is gone.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn delete_object(&self, url: &str) -> Result<()>;

    /// Check if the storage backend is reachable
    async fn health_check(&self) -> bool;
}

/// Storage that only records the deletions it was asked to do
pub struct NoOpStorage;

#[async_trait]
impl ObjectStorage for NoOpStorage {
    async fn delete_object(&self, url: &str) -> Result<()> {
        tracing::debug!("NoOpStorage: skipping delete of {}", url);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_storage() {
        let storage = NoOpStorage;
        assert!(
            storage
                .delete_object("gs://driftbox/users/1/files/a.txt")
                .await
                .is_ok()
        );
        assert!(storage.health_check().await);
    }
}
