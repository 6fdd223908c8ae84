//! SinkHandle - one registered sink with its own metrics and failure guard

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use contracts::{Report, ReportSink};
use tracing::{debug, instrument, warn};

use crate::metrics::SinkMetrics;

/// A registered sink
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// The sink itself
    sink: Box<dyn ReportSink>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
}

impl SinkHandle {
    /// Wrap a sink
    pub fn new<S: ReportSink + 'static>(sink: S) -> Self {
        Self::from_boxed(Box::new(sink))
    }

    pub fn from_boxed(sink: Box<dyn ReportSink>) -> Self {
        Self {
            name: sink.name().to_string(),
            sink,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Deliver one report, containing any error or panic raised by the sink.
    ///
    /// Returns true when the sink accepted the report.
    #[instrument(name = "sink_handle_deliver", skip(self, report), fields(sink = %self.name))]
    pub fn deliver(&self, report: &Report) -> bool {
        self.metrics.inc_attempt_count();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.sink.deliver(report)));

        let delivered = match outcome {
            Ok(Ok(())) => {
                debug!(sink = %self.name, bytes = report.len(), "Report delivered");
                true
            }
            Ok(Err(e)) => {
                warn!(
                    sink = %self.name,
                    error = %e,
                    configuration = e.is_configuration(),
                    "Delivery failed"
                );
                false
            }
            Err(_) => {
                warn!(sink = %self.name, "Sink panicked during delivery");
                false
            }
        };

        if delivered {
            self.metrics.inc_delivered_count();
        } else {
            self.metrics.inc_failure_count();
        }
        observability::record_delivery(&self.name, delivered);

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn deliver(&self, _report: &Report) -> Result<(), ContractError> {
            Err(ContractError::sink_delivery("failing", "mock failure"))
        }
    }

    struct PanickingSink;

    impl ReportSink for PanickingSink {
        fn name(&self) -> &str {
            "panicking"
        }

        fn deliver(&self, _report: &Report) -> Result<(), ContractError> {
            panic!("sink blew up");
        }
    }

    #[test]
    fn test_failure_is_counted() {
        let handle = SinkHandle::new(FailingSink);
        assert!(!handle.deliver(&Report::new("r")));
        let snap = handle.metrics().snapshot();
        assert_eq!(snap.attempt_count, 1);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.delivered_count, 0);
    }

    #[test]
    fn test_panic_is_contained() {
        let handle = SinkHandle::new(PanickingSink);
        assert!(!handle.deliver(&Report::new("r")));
        assert_eq!(handle.metrics().failure_count(), 1);
        assert_eq!(handle.name(), "panicking");
    }
}
