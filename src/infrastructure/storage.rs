use crate::config::Config;
use crate::services::storage::{NoOpStorage, ObjectStorage};
use std::sync::Arc;
use tracing::info;

pub fn setup_storage(config: &Config) -> Arc<dyn ObjectStorage> {
    match config.storage_backend.to_lowercase().as_str() {
        "noop" | "none" | "disabled" => {
            info!("☁️  Object storage: noop (objects are tracked, never touched)");
        }
        other => {
            tracing::warn!("Unknown storage backend '{}', using noop storage", other);
        }
    }
    Arc::new(NoOpStorage)
}
