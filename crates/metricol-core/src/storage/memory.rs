//! In-memory collector.
//!
//! Metrics live in a map of kind to name to slot. The map itself sits behind a
//! read-write lock and every slot has its own mutex, so updates to different
//! keys only contend on the map's read lock.
//!
//! Lock order: the map lock is always taken before a slot lock, never the
//! other way around. Writers that only touch an existing slot release the map
//! lock before locking the slot.

use std::collections::HashMap;
use std::sync::Arc;

use metricol_proto::{MetricKind, ScalarValue};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::metric::Metric;

type Slot = Arc<Mutex<Metric>>;

/// Thread-safe in-memory metric store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    metrics: RwLock<HashMap<MetricKind, HashMap<String, Slot>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored metrics.
    pub fn len(&self) -> usize {
        self.metrics.read().values().map(HashMap::len).sum()
    }

    /// Whether the store holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn existing_slot(&self, kind: MetricKind, name: &str) -> Option<Slot> {
        let metrics = self.metrics.read();
        metrics.get(&kind).and_then(|by_name| by_name.get(name)).cloned()
    }

    fn slot(&self, kind: MetricKind, name: &str) -> Slot {
        if let Some(slot) = self.existing_slot(kind, name) {
            return slot;
        }

        // Another writer may have inserted the key between the two locks.
        let mut metrics = self.metrics.write();
        metrics
            .entry(kind)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Metric::new(kind, name))))
            .clone()
    }
}

impl Collector for MemoryStore {
    fn get_metric(&self, kind: MetricKind, name: &str) -> Result<ScalarValue> {
        let slot = self.existing_slot(kind, name).ok_or_else(|| Error::NotFound {
            kind,
            name: name.to_string(),
        })?;
        let value = slot.lock().value();
        Ok(value)
    }

    fn get_all_metrics(&self) -> Result<Vec<Metric>> {
        // Each value is read whole; keys are not read as one atomic cut.
        let metrics = self.metrics.read();
        let mut all = Vec::with_capacity(metrics.values().map(HashMap::len).sum());
        for kind in MetricKind::ALL {
            if let Some(by_name) = metrics.get(&kind) {
                all.extend(by_name.values().map(|slot| slot.lock().clone()));
            }
        }
        Ok(all)
    }

    fn update_metric(&self, kind: MetricKind, name: &str, value: ScalarValue) -> Result<()> {
        // Reject before creating the key so a mismatched write leaves no trace.
        if value.native_kind() != kind {
            return Err(Error::UpdateFailed {
                kind,
                name: name.to_string(),
            });
        }

        let slot = self.slot(kind, name);
        let mut metric = slot.lock();
        if metric.update(value) {
            Ok(())
        } else {
            Err(Error::UpdateFailed {
                kind,
                name: name.to_string(),
            })
        }
    }

    fn update_metrics(&self, metrics: &[Metric], cancel: &CancelToken) -> Result<()> {
        for (applied, metric) in metrics.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(applied, total = metrics.len(), "Batch update cancelled");
                return Ok(());
            }
            self.update_metric(metric.kind(), metric.name(), metric.value())?;
        }
        Ok(())
    }

    fn close(&self) {}

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_metric(MetricKind::Counter, "absent"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_counter_and_gauge_semantics() {
        let store = MemoryStore::new();
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(2)).unwrap();
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(3)).unwrap();
        store.update_metric(MetricKind::Gauge, "g", ScalarValue::Float(1.0)).unwrap();
        store.update_metric(MetricKind::Gauge, "g", ScalarValue::Float(4.5)).unwrap();

        assert_eq!(store.get_metric(MetricKind::Counter, "c").unwrap(), ScalarValue::Int(5));
        assert_eq!(store.get_metric(MetricKind::Gauge, "g").unwrap(), ScalarValue::Float(4.5));
    }

    #[test]
    fn test_kinds_are_separate_namespaces() {
        let store = MemoryStore::new();
        store.update_metric(MetricKind::Counter, "x", ScalarValue::Int(1)).unwrap();
        store.update_metric(MetricKind::Gauge, "x", ScalarValue::Float(9.0)).unwrap();

        assert_eq!(store.get_metric(MetricKind::Counter, "x").unwrap(), ScalarValue::Int(1));
        assert_eq!(store.get_metric(MetricKind::Gauge, "x").unwrap(), ScalarValue::Float(9.0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_mismatched_value_is_rejected() {
        let store = MemoryStore::new();
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(4)).unwrap();

        let err = store
            .update_metric(MetricKind::Counter, "c", ScalarValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::UpdateFailed { .. }));
        assert_eq!(store.get_metric(MetricKind::Counter, "c").unwrap(), ScalarValue::Int(4));

        assert!(store
            .update_metric(MetricKind::Gauge, "fresh", ScalarValue::Int(1))
            .is_err());
        assert!(store.get_metric(MetricKind::Gauge, "fresh").is_err());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = MemoryStore::new();
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(1)).unwrap();

        let snapshot = store.get_all_metrics().unwrap();
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(1)).unwrap();

        assert_eq!(snapshot, vec![Metric::counter("c", 1)]);
        assert_eq!(store.get_metric(MetricKind::Counter, "c").unwrap(), ScalarValue::Int(2));
    }

    #[test]
    fn test_batch_stops_when_cancelled() {
        let store = MemoryStore::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        store
            .update_metrics(&[Metric::counter("c", 1), Metric::gauge("g", 1.0)], &cancel)
            .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_batch_merges_repeated_keys() {
        let store = MemoryStore::new();
        let batch = [Metric::counter("c", 1), Metric::counter("c", 2), Metric::gauge("g", 3.0)];
        store.update_metrics(&batch, &CancelToken::new()).unwrap();

        assert_eq!(store.get_metric(MetricKind::Counter, "c").unwrap(), ScalarValue::Int(3));
        assert_eq!(store.get_metric(MetricKind::Gauge, "g").unwrap(), ScalarValue::Float(3.0));
    }
}
