use crate::config::Config;
use crate::services::file_service::FileService;
use crate::services::record_store::{ExpiryCursor, RecordStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Single owner of expiry deletions.
///
/// Each pass resumes after the last file the previous pass looked at and
/// wraps to the start once the expired set is exhausted, so files whose
/// storage delete keeps failing are retried without blocking the rest.
pub struct ExpirySweeper {
    store: RecordStore,
    file_service: Arc<FileService>,
    config: Config,
    shutdown: watch::Receiver<bool>,
    cursor: Option<ExpiryCursor>,
}

impl ExpirySweeper {
    pub fn new(
        store: RecordStore,
        file_service: Arc<FileService>,
        config: Config,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            file_service,
            config,
            shutdown,
            cursor: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Expiry sweeper started (every {}s, batch {})",
            self.config.sweep_interval_secs,
            self.config.sweep_batch_size
        );

        // First tick fires immediately, so files that expired while down go first
        let mut ticker = interval(self.config.sweep_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Expiry sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep(Utc::now()).await {
                        Ok(report) if report.expired > 0 => tracing::info!(
                            "✅ Sweep done: {} expired, {} removed, {} failed",
                            report.expired,
                            report.removed,
                            report.failed
                        ),
                        Ok(_) => tracing::debug!("Sweep done: nothing expired"),
                        Err(e) => tracing::error!("Sweep failed: {}", e),
                    }
                }
            }
        }
    }

    /// One pass over files whose `expires_at` is at or before `now`.
    pub async fn sweep(&mut self, now: DateTime<Utc>) -> anyhow::Result<SweepReport> {
        tracing::debug!("🧹 Sweeping files expired before {}", now);

        let batch_size = self.config.sweep_batch_size;
        let expired = self
            .store
            .find_expired_after(now, self.cursor.as_ref(), batch_size)
            .await?;

        // A short page means the end of the expired set; start over next time
        self.cursor = if (expired.len() as u64) < batch_size {
            None
        } else {
            expired.last().map(ExpiryCursor::from)
        };

        let mut report = SweepReport {
            expired: expired.len(),
            ..Default::default()
        };

        for file in expired {
            tracing::info!("Expiring file: {}", file.id);
            match self.file_service.remove_file(&file).await {
                Ok(_) => report.removed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Failed to expire file {}: {}", file.id, e);
                }
            }
        }

        Ok(report)
    }
}
