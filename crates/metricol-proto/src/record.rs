//! JSON metric records.
//!
//! A record is the flat form of one metric: `{"id", "type", "delta"?, "value"?}`.
//! Counters carry `delta`, gauges carry `value`. The same shape is used for
//! HTTP bodies (single records and arrays) and for the snapshot file.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::kind::{MetricKind, ScalarValue};

/// One metric on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Metric name.
    pub id: String,
    /// Metric kind.
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// Counter delta (or absolute value when read back from a store).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    /// Gauge value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl MetricRecord {
    /// A record that names a metric without carrying a value.
    pub fn new(id: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            id: id.into(),
            kind,
            delta: None,
            value: None,
        }
    }

    /// A counter record.
    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self::new(id, MetricKind::Counter).with_scalar(ScalarValue::Int(delta))
    }

    /// A gauge record.
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, MetricKind::Gauge).with_scalar(ScalarValue::Float(value))
    }

    /// Store a scalar in the field matching its native type.
    pub fn with_scalar(mut self, scalar: ScalarValue) -> Self {
        match scalar {
            ScalarValue::Int(v) => self.delta = Some(v),
            ScalarValue::Float(v) => self.value = Some(v),
        }
        self
    }

    /// The scalar this record carries for its declared kind.
    ///
    /// Only the field belonging to `kind` is consulted; a gauge record with
    /// only `delta` set has no value.
    pub fn scalar(&self) -> Result<ScalarValue, Error> {
        let scalar = match self.kind {
            MetricKind::Counter => self.delta.map(ScalarValue::Int),
            MetricKind::Gauge => self.value.map(ScalarValue::Float),
        };

        scalar.ok_or_else(|| Error::MissingValue {
            id: self.id.clone(),
            kind: self.kind.to_string(),
        })
    }
}

/// Serialize records as the pretty-printed array used by snapshot files.
pub fn to_pretty_json(records: &[MetricRecord]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(records)
}
