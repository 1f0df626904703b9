//! Metric kinds and their native scalar values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The closed set of metric kinds.
///
/// A counter merges by summation of `i64` deltas, a gauge by overwrite with
/// an `f64` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Additive `i64` metric.
    Counter,
    /// Last-write-wins `f64` metric.
    Gauge,
}

impl MetricKind {
    /// All kinds, in a stable order.
    pub const ALL: [MetricKind; 2] = [MetricKind::Counter, MetricKind::Gauge];

    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }

    /// Parse a textual value into this kind's native scalar.
    pub fn parse_value(&self, text: &str) -> Result<ScalarValue, Error> {
        let invalid = |reason: String| Error::InvalidValue {
            kind: self.to_string(),
            value: text.to_string(),
            reason,
        };

        match self {
            MetricKind::Counter => text
                .parse::<i64>()
                .map(ScalarValue::Int)
                .map_err(|e| invalid(e.to_string())),
            MetricKind::Gauge => text
                .parse::<f64>()
                .map(ScalarValue::Float)
                .map_err(|e| invalid(e.to_string())),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            other => Err(Error::InvalidKind(other.to_string())),
        }
    }
}

/// A scalar carried by an update, tagged with its native type.
///
/// The native type is independent of the target kind so that a mismatch
/// (a float sent to a counter) stays representable and can be rejected by
/// the merge instead of being coerced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    /// Native `i64`, the counter type.
    Int(i64),
    /// Native `f64`, the gauge type.
    Float(f64),
}

impl ScalarValue {
    /// The kind whose native type this scalar has.
    pub fn native_kind(&self) -> MetricKind {
        match self {
            ScalarValue::Int(_) => MetricKind::Counter,
            ScalarValue::Float(_) => MetricKind::Gauge,
        }
    }

    /// The value as an `i64`, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(v) => Some(*v),
            ScalarValue::Float(_) => None,
        }
    }

    /// The value as an `f64`, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Int(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("counter".parse::<MetricKind>().unwrap(), MetricKind::Counter);
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert!(matches!(
            "gauger".parse::<MetricKind>(),
            Err(Error::InvalidKind(k)) if k == "gauger"
        ));
        assert!("Counter".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&MetricKind::Gauge).unwrap();
        assert_eq!(json, "\"gauge\"");
        let kind: MetricKind = serde_json::from_str("\"counter\"").unwrap();
        assert_eq!(kind, MetricKind::Counter);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(
            MetricKind::Counter.parse_value("-12").unwrap(),
            ScalarValue::Int(-12)
        );
        assert_eq!(
            MetricKind::Gauge.parse_value("2.5").unwrap(),
            ScalarValue::Float(2.5)
        );
        assert!(MetricKind::Counter.parse_value("2.5").is_err());
        assert!(MetricKind::Gauge.parse_value("abc").is_err());
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(ScalarValue::Int(5).to_string(), "5");
        assert_eq!(ScalarValue::Float(1.0).to_string(), "1");
        assert_eq!(ScalarValue::Float(0.25).to_string(), "0.25");
    }
}
