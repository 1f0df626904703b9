//! The collector contract shared by every storage backend.

use metricol_proto::{MetricKind, ScalarValue};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::metric::Metric;

/// A keyed metric store.
///
/// Metrics are keyed by `(kind, name)`. Implementations are safe to share
/// across threads and serialise conflicting writes per key, so concurrent
/// counter updates never lose increments.
pub trait Collector: Send + Sync {
    /// Current value of a metric.
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when no metric is
    /// stored under the key.
    fn get_metric(&self, kind: MetricKind, name: &str) -> Result<ScalarValue>;

    /// Independent copies of every stored metric.
    ///
    /// A backend that cannot produce a complete listing returns an error
    /// rather than a partial one.
    fn get_all_metrics(&self) -> Result<Vec<Metric>>;

    /// Merge `value` into the metric under `(kind, name)`, creating it at zero
    /// first if absent.
    ///
    /// Fails with [`Error::UpdateFailed`](crate::Error::UpdateFailed) when the
    /// value's native type does not match `kind`; the stored value is left
    /// unchanged in that case.
    fn update_metric(&self, kind: MetricKind, name: &str, value: ScalarValue) -> Result<()>;

    /// Merge a batch of metrics.
    ///
    /// Elements apply in order. Once `cancel` fires no further elements are
    /// started and the call returns `Ok`. Whether a partially applied batch is
    /// kept depends on the backend.
    fn update_metrics(&self, metrics: &[Metric], cancel: &CancelToken) -> Result<()>;

    /// Release resources. Call once, after all other operations.
    fn close(&self);

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Connectivity check. `None` for backends with nothing to check.
    fn ping(&self) -> Option<Result<()>> {
        None
    }
}
