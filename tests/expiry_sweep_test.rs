use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use driftbox::config::Config;
use driftbox::entities::files;
use driftbox::infrastructure::database;
use driftbox::services::file_service::FileService;
use driftbox::services::record_store::{NewFile, RecordStore};
use driftbox::services::storage::ObjectStorage;
use driftbox::services::worker::{ExpirySweeper, SweepReport};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Remembers deletions; can fail everything or only chosen URLs
struct MockStorage {
    deleted: Mutex<Vec<String>>,
    failing: AtomicBool,
    broken_urls: Mutex<Vec<String>>,
}

impl MockStorage {
    fn new() -> Self {
        Self {
            deleted: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            broken_urls: Mutex::new(Vec::new()),
        }
    }

    fn break_url(&self, url: &str) {
        self.broken_urls.lock().unwrap().push(url.to_string());
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn delete_object(&self, url: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("storage unavailable");
        }
        if self.broken_urls.lock().unwrap().iter().any(|u| u == url) {
            anyhow::bail!("object {} cannot be deleted", url);
        }
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}

struct Harness {
    store: RecordStore,
    storage: Arc<MockStorage>,
    sweeper: ExpirySweeper,
    shutdown: watch::Sender<bool>,
}

async fn setup(batch_size: u64) -> Harness {
    let config = Config {
        sweep_batch_size: batch_size,
        ..Config::development()
    };
    let db = database::setup_database(&config).await.unwrap();
    let store = RecordStore::new(db);
    let storage = Arc::new(MockStorage::new());
    let file_service = Arc::new(FileService::new(store.clone(), storage.clone()));
    let (shutdown, shutdown_rx) = watch::channel(false);
    let sweeper = ExpirySweeper::new(store.clone(), file_service, config, shutdown_rx);

    Harness {
        store,
        storage,
        sweeper,
        shutdown,
    }
}

async fn add_file(store: &RecordStore, name: &str, expires_at: DateTime<Utc>) -> files::Model {
    store
        .create_file(NewFile {
            file_name: name.to_string(),
            gcs_url: format!("gs://driftbox/{}", name),
            expires_at: Some(expires_at),
            ..Default::default()
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sweep_removes_only_expired_files() {
    let mut h = setup(100).await;
    let now = Utc::now();

    let expired_a = add_file(&h.store, "a.txt", now - Duration::hours(3)).await;
    let expired_b = add_file(&h.store, "b.txt", now).await;
    let live = add_file(&h.store, "c.txt", now + Duration::hours(1)).await;

    let report = h.sweeper.sweep(now).await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            expired: 2,
            removed: 2,
            failed: 0
        }
    );

    assert!(h.store.get_file(&expired_a.id).await.unwrap().is_none());
    assert!(h.store.get_file(&expired_b.id).await.unwrap().is_none());
    assert!(h.store.get_file(&live.id).await.unwrap().is_some());

    let mut deleted = h.storage.deleted();
    deleted.sort();
    assert_eq!(deleted, vec![expired_a.gcs_url, expired_b.gcs_url]);

    // Nothing left to do on the next pass
    assert_eq!(h.sweeper.sweep(now).await.unwrap(), SweepReport::default());
}

#[tokio::test]
async fn test_failed_storage_delete_keeps_record() {
    let mut h = setup(100).await;
    let now = Utc::now();
    let file = add_file(&h.store, "stuck.bin", now - Duration::minutes(5)).await;

    h.storage.failing.store(true, Ordering::SeqCst);
    let report = h.sweeper.sweep(now).await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.removed, 0);
    assert!(h.store.get_file(&file.id).await.unwrap().is_some());

    h.storage.failing.store(false, Ordering::SeqCst);
    let report = h.sweeper.sweep(now).await.unwrap();
    assert_eq!(report.removed, 1);
    assert!(h.store.get_file(&file.id).await.unwrap().is_none());
    assert_eq!(h.storage.deleted(), vec![file.gcs_url]);
}

#[tokio::test]
async fn test_sweep_honours_batch_size() {
    let mut h = setup(2).await;
    let now = Utc::now();
    for i in 0..5 {
        add_file(&h.store, &format!("f{i}.txt"), now - Duration::minutes(i + 1)).await;
    }

    assert_eq!(h.sweeper.sweep(now).await.unwrap().removed, 2);
    assert_eq!(h.sweeper.sweep(now).await.unwrap().removed, 2);
    assert_eq!(h.sweeper.sweep(now).await.unwrap().removed, 1);
    assert_eq!(h.sweeper.sweep(now).await.unwrap().expired, 0);
}

#[tokio::test]
async fn test_sweeper_stops_on_shutdown() {
    let h = setup(100).await;
    let handle = tokio::spawn(h.sweeper.run());

    h.shutdown.send(true).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("sweeper did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_undeletable_file_does_not_block_others() {
    let mut h = setup(1).await;
    let now = Utc::now();

    let stuck = add_file(&h.store, "stuck.bin", now - Duration::hours(2)).await;
    let ok = add_file(&h.store, "ok.txt", now - Duration::hours(1)).await;
    h.storage.break_url(&stuck.gcs_url);

    for _ in 0..3 {
        h.sweeper.sweep(now).await.unwrap();
    }

    assert!(h.store.get_file(&ok.id).await.unwrap().is_none());
    assert!(h.store.get_file(&stuck.id).await.unwrap().is_some());
    assert_eq!(h.storage.deleted(), vec![ok.gcs_url]);

    // The stuck file keeps being retried
    let mut retried = false;
    for _ in 0..3 {
        if h.sweeper.sweep(now).await.unwrap().failed == 1 {
            retried = true;
        }
    }
    assert!(retried);
}

#[tokio::test]
async fn test_first_sweep_runs_at_startup() {
    let h = setup(100).await;
    let file = add_file(&h.store, "stale.txt", Utc::now() - Duration::minutes(1)).await;

    let handle = tokio::spawn(h.sweeper.run());

    let mut removed = false;
    for _ in 0..40 {
        if h.store.get_file(&file.id).await.unwrap().is_none() {
            removed = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    h.shutdown.send(true).unwrap();
    handle.await.unwrap();
    assert!(removed, "expired file was not removed before the first interval elapsed");
}
