//! File-backed collector.
//!
//! Wraps a [`MemoryStore`] and persists it as a JSON snapshot. With a zero
//! store interval every successful update is followed by a save; otherwise a
//! background thread saves on a fixed period and once more on close.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use metricol_proto::{MetricKind, ScalarValue};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::collector::Collector;
use crate::error::Result;
use crate::metric::Metric;
use crate::snapshot;
use crate::storage::memory::MemoryStore;

/// Configuration for a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Snapshot file.
    pub path: PathBuf,
    /// Load the snapshot on open.
    pub restore: bool,
    /// Save period. Zero saves after every update.
    pub store_interval: Duration,
}

impl FileStoreConfig {
    /// Synchronous saving, with restore enabled.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            restore: true,
            store_interval: Duration::ZERO,
        }
    }

    /// Set whether the snapshot is loaded on open.
    pub fn with_restore(mut self, restore: bool) -> Self {
        self.restore = restore;
        self
    }

    /// Set the save period.
    pub fn with_store_interval(mut self, interval: Duration) -> Self {
        self.store_interval = interval;
        self
    }
}

struct SnapshotWorker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Collector persisted to a JSON snapshot file.
pub struct FileStore {
    memory: Arc<MemoryStore>,
    path: PathBuf,
    sync_writes: bool,
    /// Serialises update-then-save in synchronous mode.
    write_lock: Mutex<()>,
    worker: Mutex<Option<SnapshotWorker>>,
}

impl FileStore {
    /// Open the store, restoring the snapshot first when configured.
    ///
    /// A missing snapshot file is not an error; a malformed one is.
    pub fn open(config: FileStoreConfig) -> Result<Self> {
        let memory = Arc::new(MemoryStore::new());

        if config.restore {
            let restored = snapshot::load(&config.path)?;
            memory.update_metrics(&restored, &CancelToken::new())?;
            info!(
                path = %config.path.display(),
                metrics = restored.len(),
                "Restored metrics from snapshot"
            );
        }

        let sync_writes = config.store_interval.is_zero();
        let worker = if sync_writes {
            None
        } else {
            Some(spawn_worker(
                Arc::clone(&memory),
                config.path.clone(),
                config.store_interval,
            )?)
        };

        Ok(Self {
            memory,
            path: config.path,
            sync_writes,
            write_lock: Mutex::new(()),
            worker: Mutex::new(worker),
        })
    }

    /// Snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current state to the snapshot file now.
    pub fn flush(&self) -> Result<()> {
        save(&self.memory, &self.path)
    }

    fn stop_worker(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        let _ = worker.stop.send(());
        if worker.handle.join().is_err() {
            error!(path = %self.path.display(), "Snapshot worker panicked");
        }
    }
}

fn save(memory: &MemoryStore, path: &Path) -> Result<()> {
    let metrics = memory.get_all_metrics()?;
    snapshot::save(&metrics, path)?;
    debug!(path = %path.display(), metrics = metrics.len(), "Saved snapshot");
    Ok(())
}

fn spawn_worker(
    memory: Arc<MemoryStore>,
    path: PathBuf,
    interval: Duration,
) -> Result<SnapshotWorker> {
    let (stop, stop_rx) = mpsc::channel::<()>();

    let handle = thread::Builder::new()
        .name("metricol-snapshot".into())
        .spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = save(&memory, &path) {
                            warn!(error = %e, path = %path.display(), "Periodic snapshot failed");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            if let Err(e) = save(&memory, &path) {
                error!(error = %e, path = %path.display(), "Final snapshot failed");
            }
        })?;

    Ok(SnapshotWorker { stop, handle })
}

impl Collector for FileStore {
    fn get_metric(&self, kind: MetricKind, name: &str) -> Result<ScalarValue> {
        self.memory.get_metric(kind, name)
    }

    fn get_all_metrics(&self) -> Result<Vec<Metric>> {
        self.memory.get_all_metrics()
    }

    fn update_metric(&self, kind: MetricKind, name: &str, value: ScalarValue) -> Result<()> {
        if !self.sync_writes {
            return self.memory.update_metric(kind, name, value);
        }

        let _guard = self.write_lock.lock();
        self.memory.update_metric(kind, name, value)?;
        save(&self.memory, &self.path)
    }

    fn update_metrics(&self, metrics: &[Metric], cancel: &CancelToken) -> Result<()> {
        if !self.sync_writes {
            return self.memory.update_metrics(metrics, cancel);
        }

        let _guard = self.write_lock.lock();
        self.memory.update_metrics(metrics, cancel)?;
        save(&self.memory, &self.path)
    }

    fn close(&self) {
        self.stop_worker();
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::tempdir;

    #[test]
    fn test_sync_mode_saves_each_update() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let store = FileStore::open(FileStoreConfig::new(&path)).unwrap();

        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(3)).unwrap();
        assert_eq!(snapshot::load(&path).unwrap(), vec![Metric::counter("c", 3)]);

        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(4)).unwrap();
        assert_eq!(snapshot::load(&path).unwrap(), vec![Metric::counter("c", 7)]);
    }

    #[test]
    fn test_restore_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        snapshot::save(&[Metric::counter("c", 10), Metric::gauge("g", 2.5)], &path).unwrap();

        let store = FileStore::open(FileStoreConfig::new(&path)).unwrap();
        assert_eq!(store.get_metric(MetricKind::Counter, "c").unwrap(), ScalarValue::Int(10));
        assert_eq!(store.get_metric(MetricKind::Gauge, "g").unwrap(), ScalarValue::Float(2.5));
    }

    #[test]
    fn test_restore_disabled_ignores_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs_write(&path, b"garbage");

        let store = FileStore::open(FileStoreConfig::new(&path).with_restore(false)).unwrap();
        assert!(store.get_all_metrics().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_snapshot_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs_write(&path, b"[{\"id\": 1}");

        assert!(matches!(
            FileStore::open(FileStoreConfig::new(&path)),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_failed_update_does_not_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let store = FileStore::open(FileStoreConfig::new(&path)).unwrap();

        assert!(store
            .update_metric(MetricKind::Gauge, "g", ScalarValue::Int(1))
            .is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_periodic_mode_flushes_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let config = FileStoreConfig::new(&path).with_store_interval(Duration::from_secs(3600));
        let store = FileStore::open(config).unwrap();

        store.update_metric(MetricKind::Gauge, "g", ScalarValue::Float(1.25)).unwrap();
        assert!(!path.exists());

        store.close();
        assert_eq!(snapshot::load(&path).unwrap(), vec![Metric::gauge("g", 1.25)]);
    }

    #[test]
    fn test_periodic_mode_saves_on_tick() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let config = FileStoreConfig::new(&path).with_store_interval(Duration::from_millis(20));
        let store = FileStore::open(config).unwrap();

        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(1)).unwrap();

        let mut saved = false;
        for _ in 0..100 {
            thread::sleep(Duration::from_millis(20));
            if snapshot::load(&path).map(|m| !m.is_empty()).unwrap_or(false) {
                saved = true;
                break;
            }
        }
        assert!(saved);
        store.close();
    }

    fn fs_write(path: &Path, bytes: &[u8]) {
        std::fs::write(path, bytes).unwrap();
    }
}
