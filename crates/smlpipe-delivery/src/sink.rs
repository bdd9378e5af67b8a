use smlpipe_decode::Metric;

use crate::error::SinkError;

/// A downstream destination for metrics.
///
/// Each sink is owned by exactly one worker thread, so implementations may
/// hold connections and other mutable state without locking.
pub trait Sink: Send {
    /// Short label used in logs and as the queue id.
    fn name(&self) -> &str;

    /// Write one metric. Any error leaves the metric with the caller, who
    /// requeues it.
    fn deliver(&mut self, metric: &Metric) -> Result<(), SinkError>;
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn deliver(&mut self, metric: &Metric) -> Result<(), SinkError> {
        (**self).deliver(metric)
    }
}
