//! The metric model.
//!
//! A [`Metric`] is a name plus a kind-tagged value. All merging goes through
//! [`Metric::update`], which is the single place counter summation and gauge
//! replacement are defined; every store (memory, file, database) reuses it.

use metricol_proto::{MetricKind, MetricRecord, ScalarValue};

use crate::error::Result;

/// Stored value of a metric, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Running sum of all applied deltas.
    Counter(i64),
    /// Last value written.
    Gauge(f64),
}

impl MetricValue {
    /// Zero value for a kind.
    pub fn zero(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => MetricValue::Counter(0),
            MetricKind::Gauge => MetricValue::Gauge(0.0),
        }
    }

    /// The kind this value belongs to.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
        }
    }

    /// The value as a native scalar.
    pub fn scalar(&self) -> ScalarValue {
        match self {
            MetricValue::Counter(v) => ScalarValue::Int(*v),
            MetricValue::Gauge(v) => ScalarValue::Float(*v),
        }
    }
}

/// A named metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    value: MetricValue,
}

impl Metric {
    /// A zero-valued metric of the given kind.
    pub fn new(kind: MetricKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::zero(kind),
        }
    }

    /// A counter holding `value`.
    pub fn counter(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Counter(value),
        }
    }

    /// A gauge holding `value`.
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: MetricValue::Gauge(value),
        }
    }

    /// Metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metric kind.
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    /// Current value as a native scalar.
    pub fn value(&self) -> ScalarValue {
        self.value.scalar()
    }

    /// Current value, kind-tagged.
    pub fn metric_value(&self) -> MetricValue {
        self.value
    }

    /// Merge `value` into this metric.
    ///
    /// Counters add the delta (wrapping on overflow), gauges take the new
    /// value. Returns `false` without touching the metric when the scalar's
    /// native type is not this kind's.
    pub fn update(&mut self, value: ScalarValue) -> bool {
        match (&mut self.value, value) {
            (MetricValue::Counter(current), ScalarValue::Int(delta)) => {
                *current = current.wrapping_add(delta);
                true
            }
            (MetricValue::Gauge(current), ScalarValue::Float(v)) => {
                *current = v;
                true
            }
            (MetricValue::Counter(_), ScalarValue::Float(_))
            | (MetricValue::Gauge(_), ScalarValue::Int(_)) => false,
        }
    }

    /// Wire form of this metric.
    pub fn to_record(&self) -> MetricRecord {
        MetricRecord::new(self.name.clone(), self.kind()).with_scalar(self.value())
    }

    /// Rebuild a metric from its wire form.
    pub fn from_record(record: MetricRecord) -> Result<Self> {
        let scalar = record.scalar()?;
        let mut metric = Metric::new(record.kind, record.id);
        // `scalar()` reads the field belonging to `kind`, so this always merges.
        metric.update(scalar);
        Ok(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_additive() {
        let mut counter = Metric::new(MetricKind::Counter, "c");
        assert!(counter.update(ScalarValue::Int(5)));
        assert!(counter.update(ScalarValue::Int(-2)));
        assert_eq!(counter.value(), ScalarValue::Int(3));
    }

    #[test]
    fn test_gauge_is_replacement() {
        let mut gauge = Metric::new(MetricKind::Gauge, "g");
        assert!(gauge.update(ScalarValue::Float(1.5)));
        assert!(gauge.update(ScalarValue::Float(-0.5)));
        assert_eq!(gauge.value(), ScalarValue::Float(-0.5));
    }

    #[test]
    fn test_wrong_native_type_leaves_value() {
        let mut counter = Metric::counter("c", 7);
        assert!(!counter.update(ScalarValue::Float(1.0)));
        assert_eq!(counter.value(), ScalarValue::Int(7));

        let mut gauge = Metric::gauge("g", 2.0);
        assert!(!gauge.update(ScalarValue::Int(1)));
        assert_eq!(gauge.value(), ScalarValue::Float(2.0));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Metric::counter("c", 1);
        let mut copy = original.clone();
        copy.update(ScalarValue::Int(10));

        assert_eq!(original.value(), ScalarValue::Int(1));
        assert_eq!(copy.value(), ScalarValue::Int(11));
        assert_eq!(copy.name(), "c");
        assert_eq!(copy.kind(), MetricKind::Counter);
    }

    #[test]
    fn test_counter_overflow_wraps() {
        let mut counter = Metric::counter("c", i64::MAX);
        assert!(counter.update(ScalarValue::Int(1)));
        assert_eq!(counter.value(), ScalarValue::Int(i64::MIN));
    }

    #[test]
    fn test_record_conversion() {
        let gauge = Metric::gauge("Alloc", 3.25);
        let record = gauge.to_record();
        assert_eq!(record, MetricRecord::gauge("Alloc", 3.25));
        assert_eq!(Metric::from_record(record).unwrap(), gauge);

        let missing = MetricRecord::new("x", MetricKind::Counter);
        assert!(Metric::from_record(missing).is_err());
    }
}
