//! Snapshot files.
//!
//! A snapshot is a pretty-printed JSON array of metric records. Saving
//! overwrites the whole file; loading a missing file yields no metrics.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use metricol_proto::record::{to_pretty_json, MetricRecord};

use crate::error::Result;
use crate::metric::Metric;

/// Read a snapshot. A missing file is an empty snapshot; malformed content is an error.
pub fn load(path: &Path) -> Result<Vec<Metric>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let records: Vec<MetricRecord> = serde_json::from_slice(&bytes)?;
    records.into_iter().map(Metric::from_record).collect()
}

/// Write `metrics` to `path`, replacing any previous content.
pub fn save(metrics: &[Metric], path: &Path) -> Result<()> {
    let records: Vec<MetricRecord> = metrics.iter().map(Metric::to_record).collect();
    fs::write(path, to_pretty_json(&records)?)?;
    Ok(())
}
