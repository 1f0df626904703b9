//! SQLite-backed collector.
//!
//! Metrics live in a single `metriccollector` table keyed by name. Every write
//! is read-merge-write under one store-wide lock, which keeps counter
//! increments from being lost. Batches run in one transaction.
//!
//! The table is keyed by name alone, so a name stored as one kind cannot be
//! written as the other: such updates fail and such reads miss.

use std::path::Path;

use metricol_proto::{MetricKind, ScalarValue};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::metric::Metric;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS metriccollector (
        id VARCHAR(250) PRIMARY KEY,
        type TEXT NOT NULL,
        delta INTEGER,
        value DOUBLE PRECISION
    );
";

const SELECT_ONE: &str = "SELECT id, type, delta, value FROM metriccollector WHERE id = ?1";

const SELECT_ALL: &str = "SELECT id, type, delta, value FROM metriccollector ORDER BY id";

const UPSERT: &str = "
    INSERT INTO metriccollector (id, type, delta, value) VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(id) DO UPDATE SET delta = excluded.delta, value = excluded.value
";

/// Raw column values of one row.
struct Row {
    id: String,
    kind: String,
    delta: Option<i64>,
    value: Option<f64>,
}

impl Row {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            delta: row.get(2)?,
            value: row.get(3)?,
        })
    }

    fn decode(self) -> Result<Metric> {
        let kind: MetricKind = self.kind.parse()?;
        match (kind, self.delta, self.value) {
            (MetricKind::Counter, Some(delta), None) => Ok(Metric::counter(self.id, delta)),
            (MetricKind::Gauge, None, Some(value)) => Ok(Metric::gauge(self.id, value)),
            (kind, delta, value) => {
                let reason = match (delta.is_some(), value.is_some()) {
                    (true, true) => format!("{kind} row has both delta and value"),
                    (false, false) => format!("{kind} row has neither delta nor value"),
                    (true, false) => format!("{kind} row has a delta"),
                    (false, true) => format!("{kind} row has a value"),
                };
                Err(Error::CorruptRow {
                    reason,
                    id: self.id,
                })
            }
        }
    }
}

/// Collector stored in a SQLite database.
pub struct DatabaseStore {
    conn: Mutex<Option<Connection>>,
}

impl DatabaseStore {
    /// Open (or create) the database at `path` and ensure the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened metrics database");
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(Error::Closed)?;
        f(conn)
    }
}

fn read_metric(conn: &Connection, name: &str) -> Result<Option<Metric>> {
    let row = conn
        .prepare_cached(SELECT_ONE)?
        .query_row(params![name], Row::read)
        .optional()?;
    row.map(Row::decode).transpose()
}

/// Read, merge and write back one metric. `conn` may be a transaction.
fn merge(conn: &Connection, kind: MetricKind, name: &str, value: ScalarValue) -> Result<()> {
    let update_failed = || Error::UpdateFailed {
        kind,
        name: name.to_string(),
    };

    if value.native_kind() != kind {
        return Err(update_failed());
    }

    let mut metric = match read_metric(conn, name)? {
        Some(existing) if existing.kind() == kind => existing,
        Some(_) => return Err(update_failed()),
        None => Metric::new(kind, name),
    };
    if !metric.update(value) {
        return Err(update_failed());
    }

    let record = metric.to_record();
    conn.prepare_cached(UPSERT)?.execute(params![
        record.id,
        record.kind.as_str(),
        record.delta,
        record.value
    ])?;
    Ok(())
}

impl Collector for DatabaseStore {
    fn get_metric(&self, kind: MetricKind, name: &str) -> Result<ScalarValue> {
        self.with_conn(|conn| match read_metric(conn, name)? {
            Some(metric) if metric.kind() == kind => Ok(metric.value()),
            _ => Err(Error::NotFound {
                kind,
                name: name.to_string(),
            }),
        })
    }

    fn get_all_metrics(&self) -> Result<Vec<Metric>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(SELECT_ALL)?;
            let rows = stmt.query_map([], Row::read)?;

            let mut metrics = Vec::new();
            for row in rows {
                metrics.push(row?.decode()?);
            }
            Ok(metrics)
        })
    }

    fn update_metric(&self, kind: MetricKind, name: &str, value: ScalarValue) -> Result<()> {
        self.with_conn(|conn| merge(conn, kind, name, value))
    }

    fn update_metrics(&self, metrics: &[Metric], cancel: &CancelToken) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }

        self.with_conn(|conn| {
            // Dropping the transaction without commit rolls it back.
            let tx = conn.transaction()?;
            for metric in metrics {
                if cancel.is_cancelled() {
                    debug!(total = metrics.len(), "Batch cancelled, rolling back");
                    return Ok(());
                }
                merge(&tx, metric.kind(), metric.name(), metric.value())?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn close(&self) {
        if let Some(conn) = self.conn.lock().take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "Failed to close metrics database");
            }
        }
    }

    fn backend(&self) -> &'static str {
        "database"
    }

    fn ping(&self) -> Option<Result<()>> {
        Some(self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_get() {
        let store = DatabaseStore::open_in_memory().unwrap();
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(2)).unwrap();
        store.update_metric(MetricKind::Counter, "c", ScalarValue::Int(5)).unwrap();
        store.update_metric(MetricKind::Gauge, "g", ScalarValue::Float(0.5)).unwrap();

        assert_eq!(store.get_metric(MetricKind::Counter, "c").unwrap(), ScalarValue::Int(7));
        assert_eq!(store.get_metric(MetricKind::Gauge, "g").unwrap(), ScalarValue::Float(0.5));
    }

    #[test]
    fn test_name_is_bound_to_one_kind() {
        let store = DatabaseStore::open_in_memory().unwrap();
        store.update_metric(MetricKind::Counter, "x", ScalarValue::Int(1)).unwrap();

        assert!(matches!(
            store.update_metric(MetricKind::Gauge, "x", ScalarValue::Float(1.0)),
            Err(Error::UpdateFailed { .. })
        ));
        assert!(matches!(
            store.get_metric(MetricKind::Gauge, "x"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_row_fails_listing() {
        let store = DatabaseStore::open_in_memory().unwrap();
        store.update_metric(MetricKind::Counter, "ok", ScalarValue::Int(1)).unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO metriccollector (id, type, delta, value) VALUES ('bad', 'counter', NULL, 1.0)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(store.get_all_metrics(), Err(Error::CorruptRow { .. })));
    }

    #[test]
    fn test_row_with_both_columns_is_corrupt() {
        let store = DatabaseStore::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO metriccollector (id, type, delta, value) VALUES ('x', 'gauge', 5, 2.0)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            store.get_all_metrics(),
            Err(Error::CorruptRow { id, .. }) if id == "x"
        ));
        assert!(matches!(
            store.get_metric(MetricKind::Gauge, "x"),
            Err(Error::CorruptRow { .. })
        ));
    }

    #[test]
    fn test_unknown_type_in_row() {
        let store = DatabaseStore::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO metriccollector (id, type, delta, value) VALUES ('h', 'histogram', 1, NULL)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(store.get_all_metrics(), Err(Error::InvalidKind(_))));
    }

    #[test]
    fn test_cancelled_batch_commits_nothing() {
        let store = DatabaseStore::open_in_memory().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        store.update_metrics(&[Metric::counter("c", 1)], &cancel).unwrap();
        assert!(store.get_all_metrics().unwrap().is_empty());
    }

    #[test]
    fn test_closed_store() {
        let store = DatabaseStore::open_in_memory().unwrap();
        assert!(store.ping().unwrap().is_ok());

        store.close();
        assert!(matches!(store.get_all_metrics(), Err(Error::Closed)));
        assert!(matches!(store.ping(), Some(Err(Error::Closed))));
    }
}
