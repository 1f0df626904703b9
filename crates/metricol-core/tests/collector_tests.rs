//! Behaviour shared by every collector backend.

use std::sync::Arc;
use std::thread;

use metricol_core::{
    snapshot, CancelToken, Collector, DatabaseStore, Error, FileStore, FileStoreConfig,
    MemoryStore, Metric, MetricKind, ScalarValue,
};
use tempfile::{tempdir, TempDir};

fn backends() -> Vec<(Arc<dyn Collector>, TempDir)> {
    let mut out: Vec<(Arc<dyn Collector>, TempDir)> = Vec::new();

    out.push((Arc::new(MemoryStore::new()), tempdir().unwrap()));

    let dir = tempdir().unwrap();
    let file = FileStore::open(FileStoreConfig::new(dir.path().join("metrics.json"))).unwrap();
    out.push((Arc::new(file), dir));

    let dir = tempdir().unwrap();
    let db = DatabaseStore::open(dir.path().join("metrics.db")).unwrap();
    out.push((Arc::new(db), dir));

    out
}

#[test]
fn concurrent_counter_updates_are_not_lost() {
    let store = Arc::new(MemoryStore::new());

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    store
                        .update_metric(MetricKind::Counter, "hits", ScalarValue::Int(1))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        store.get_metric(MetricKind::Counter, "hits").unwrap(),
        ScalarValue::Int(1_000_000)
    );
}

#[test]
fn concurrent_updates_on_every_backend() {
    for (store, _dir) in backends() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .update_metric(MetricKind::Counter, "hits", ScalarValue::Int(1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            store.get_metric(MetricKind::Counter, "hits").unwrap(),
            ScalarValue::Int(400),
            "backend {}",
            store.backend()
        );
        store.close();
    }
}

#[test]
fn gauge_keeps_last_write() {
    for (store, _dir) in backends() {
        for v in [1.0, 7.5, -3.25] {
            store.update_metric(MetricKind::Gauge, "temp", ScalarValue::Float(v)).unwrap();
        }
        assert_eq!(
            store.get_metric(MetricKind::Gauge, "temp").unwrap(),
            ScalarValue::Float(-3.25)
        );
        store.close();
    }
}

#[test]
fn reads_are_idempotent() {
    for (store, _dir) in backends() {
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(9)).unwrap();
        let first = store.get_metric(MetricKind::Counter, "c").unwrap();
        let second = store.get_metric(MetricKind::Counter, "c").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.get_all_metrics().unwrap(), store.get_all_metrics().unwrap());
        store.close();
    }
}

#[test]
fn mismatched_update_leaves_value_unchanged() {
    for (store, _dir) in backends() {
        store.update_metric(MetricKind::Gauge, "g", ScalarValue::Float(2.0)).unwrap();
        let err = store
            .update_metric(MetricKind::Gauge, "g", ScalarValue::Int(5))
            .unwrap_err();
        assert!(matches!(err, Error::UpdateFailed { .. }), "backend {}", store.backend());
        assert_eq!(
            store.get_metric(MetricKind::Gauge, "g").unwrap(),
            ScalarValue::Float(2.0)
        );
        store.close();
    }
}

#[test]
fn missing_metric_is_not_found() {
    for (store, _dir) in backends() {
        assert!(matches!(
            store.get_metric(MetricKind::Counter, "nope"),
            Err(Error::NotFound { .. })
        ));
        store.close();
    }
}

#[test]
fn file_store_round_trips_through_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metrics.json");

    let store = FileStore::open(FileStoreConfig::new(&path)).unwrap();
    let batch = [Metric::counter("PollCount", 4), Metric::gauge("Alloc", 1024.5)];
    store.update_metrics(&batch, &CancelToken::new()).unwrap();
    store.close();
    drop(store);

    let reopened = FileStore::open(FileStoreConfig::new(&path)).unwrap();
    let mut restored = reopened.get_all_metrics().unwrap();
    restored.sort_by(|a, b| a.name().cmp(b.name()));

    assert_eq!(restored, vec![Metric::gauge("Alloc", 1024.5), Metric::counter("PollCount", 4)]);
    assert_eq!(snapshot::load(&path).unwrap().len(), 2);
}

#[test]
fn database_batch_commits_all_or_nothing() {
    let dir = tempdir().unwrap();
    let store = DatabaseStore::open(dir.path().join("metrics.db")).unwrap();
    let cancel = CancelToken::new();

    store
        .update_metrics(&[Metric::counter("a", 5), Metric::gauge("b", 2.5)], &cancel)
        .unwrap();
    assert_eq!(store.get_metric(MetricKind::Counter, "a").unwrap(), ScalarValue::Int(5));
    assert_eq!(store.get_metric(MetricKind::Gauge, "b").unwrap(), ScalarValue::Float(2.5));
    store.close();

    let dir = tempdir().unwrap();
    let store = DatabaseStore::open(dir.path().join("metrics.db")).unwrap();
    // "b" is a gauge by the time the third element runs.
    let batch = [Metric::counter("a", 5), Metric::gauge("b", 2.5), Metric::counter("b", 1)];
    assert!(matches!(
        store.update_metrics(&batch, &cancel),
        Err(Error::UpdateFailed { .. })
    ));
    assert!(store.get_all_metrics().unwrap().is_empty());
    store.close();
}

#[test]
fn database_batch_merges_repeated_keys() {
    let store = DatabaseStore::open_in_memory().unwrap();
    store.update_metric(MetricKind::Counter, "a", ScalarValue::Int(1)).unwrap();

    let batch = [Metric::counter("a", 2), Metric::counter("a", 3)];
    store.update_metrics(&batch, &CancelToken::new()).unwrap();

    assert_eq!(store.get_metric(MetricKind::Counter, "a").unwrap(), ScalarValue::Int(6));
}

#[test]
fn database_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metrics.db");

    let store = DatabaseStore::open(&path).unwrap();
    store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(3)).unwrap();
    store.close();

    let store = DatabaseStore::open(&path).unwrap();
    assert_eq!(store.get_all_metrics().unwrap(), vec![Metric::counter("c", 3)]);
}
