use crate::entities::files;
use crate::services::record_store::RecordStore;
use crate::services::storage::ObjectStorage;
use anyhow::Result;
use std::sync::Arc;

/// Removes files from both places they live: the object storage and the
/// record store. Shared by owner removal and the expiry sweep.
pub struct FileService {
    store: RecordStore,
    storage: Arc<dyn ObjectStorage>,
}

impl FileService {
    pub fn new(store: RecordStore, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Delete the storage object, then the record.
    ///
    /// The record is only removed once the object is gone, so a failed
    /// storage call leaves the file visible to the next attempt.
    pub async fn remove_file(&self, file: &files::Model) -> Result<bool> {
        self.storage.delete_object(&file.gcs_url).await?;
        let deleted = self.store.delete_file(&file.id).await?;

        tracing::info!("Removed file {} ({})", file.id, file.gcs_url);
        Ok(deleted)
    }
}
