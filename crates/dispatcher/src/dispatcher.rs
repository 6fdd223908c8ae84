//! Dispatcher - fan-out of one report to every registered sink

use std::sync::{Arc, PoisonError, RwLock};

use contracts::{AppIdentity, Report, ReportSink, SinkConfig, SinkType};
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{EventLogSink, FileSink, HttpSink, MailSink};

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    /// Sinks invoked
    pub attempted: usize,
    /// Sinks that accepted the report
    pub delivered: usize,
    /// Sinks that returned an error or panicked
    pub failed: usize,
}

/// Ordered sink registry.
///
/// Sinks are appended, never removed or reordered. A dispatch iterates a
/// snapshot of the registry, so concurrent dispatches never wait on each other
/// and a sink added mid-dispatch is first used by the next dispatch.
#[derive(Default)]
pub struct Dispatcher {
    sinks: RwLock<Vec<Arc<SinkHandle>>>,
}

impl Dispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher with pre-built handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self {
            sinks: RwLock::new(handles.into_iter().map(Arc::new).collect()),
        }
    }

    /// Append a sink. No limit, duplicates allowed.
    pub fn add_sink(&self, sink: Box<dyn ReportSink>) {
        let handle = Arc::new(SinkHandle::from_boxed(sink));
        debug!(sink = %handle.name(), "Sink registered");
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Number of registered sinks
    pub fn len(&self) -> usize {
        self.registered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sink names in registration order
    pub fn sink_names(&self) -> Vec<String> {
        self.registered()
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.registered()
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Deliver the report to every sink in registration order.
    ///
    /// A failing sink never prevents delivery to the sinks after it.
    #[instrument(name = "dispatcher_dispatch", skip(self, report), fields(bytes = report.len()))]
    pub fn dispatch(&self, report: &Report) -> DispatchSummary {
        let handles = self.registered();
        let mut summary = DispatchSummary {
            attempted: handles.len(),
            ..DispatchSummary::default()
        };

        for handle in &handles {
            if handle.deliver(report) {
                summary.delivered += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            "Report dispatched"
        );
        summary
    }

    fn registered(&self) -> Vec<Arc<SinkHandle>> {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Create a sink from configuration
#[instrument(
    name = "dispatcher_create_sink",
    skip(config, app),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink(
    config: &SinkConfig,
    app: &AppIdentity,
) -> Result<Box<dyn ReportSink>, DispatcherError> {
    let sink: Box<dyn ReportSink> = match config.sink_type {
        SinkType::File => Box::new(
            FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?,
        ),
        SinkType::EventLog => Box::new(EventLogSink::from_params(
            &config.name,
            &config.params,
            app,
        )),
        SinkType::Mail => Box::new(
            MailSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?,
        ),
        SinkType::Http => Box::new(
            HttpSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?,
        ),
    };
    Ok(sink)
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, app), fields(sink_count = sink_configs.len()))]
pub fn create_dispatcher(
    sink_configs: &[SinkConfig],
    app: &AppIdentity,
) -> Result<Dispatcher, DispatcherError> {
    let dispatcher = Dispatcher::new();
    for config in sink_configs {
        dispatcher.add_sink(create_sink(config, app)?);
    }
    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use std::sync::Mutex;

    /// Records every delivery into a shared log
    struct RecordingSink {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl ReportSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn deliver(&self, report: &Report) -> Result<(), ContractError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, report));
            if self.fail {
                return Err(ContractError::sink_delivery(&self.name, "mock failure"));
            }
            Ok(())
        }
    }

    fn recording(name: &str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Box<dyn ReportSink> {
        Box::new(RecordingSink {
            name: name.to_string(),
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn test_dispatch_fanout_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new();
        dispatcher.add_sink(recording("a", &log, false));
        dispatcher.add_sink(recording("b", &log, false));
        dispatcher.add_sink(recording("c", &log, false));

        let summary = dispatcher.dispatch(&Report::new("r1"));

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.delivered, 3);
        assert_eq!(*log.lock().unwrap(), vec!["a:r1", "b:r1", "c:r1"]);
    }

    #[test]
    fn test_failure_isolation() {
        for failing_index in 0..3 {
            let log = Arc::new(Mutex::new(Vec::new()));
            let dispatcher = Dispatcher::new();
            for i in 0..3 {
                dispatcher.add_sink(recording(&format!("s{i}"), &log, i == failing_index));
            }

            let summary = dispatcher.dispatch(&Report::new("r"));

            assert_eq!(summary.attempted, 3);
            assert_eq!(summary.delivered, 2);
            assert_eq!(summary.failed, 1);
            assert_eq!(log.lock().unwrap().len(), 3);
        }
    }

    #[test]
    fn test_duplicate_sinks_each_receive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new();
        dispatcher.add_sink(recording("dup", &log, false));
        dispatcher.add_sink(recording("dup", &log, false));

        dispatcher.dispatch(&Report::new("r"));
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(dispatcher.sink_names(), vec!["dup", "dup"]);
    }

    #[test]
    fn test_empty_dispatcher() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch(&Report::new("r")), DispatchSummary::default());
    }

    #[test]
    fn test_metrics_per_sink() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new();
        dispatcher.add_sink(recording("ok", &log, false));
        dispatcher.add_sink(recording("bad", &log, true));

        dispatcher.dispatch(&Report::new("1"));
        dispatcher.dispatch(&Report::new("2"));

        let metrics = dispatcher.metrics();
        assert_eq!(metrics[0].0, "ok");
        assert_eq!(metrics[0].1.delivered_count, 2);
        assert_eq!(metrics[1].1.failure_count, 2);
        assert_eq!(metrics[1].1.attempt_count, 2);
    }

    #[test]
    fn test_create_dispatcher_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BugReport.txt");
        let configs = vec![
            SinkConfig::new("file", SinkType::File).with_param("path", path.display().to_string()),
            SinkConfig::new("mail", SinkType::Mail),
        ];

        let dispatcher = create_dispatcher(&configs, &AppIdentity::new("viewer", "1.0")).unwrap();
        assert_eq!(dispatcher.len(), 2);

        // The unconfigured mail sink fails at delivery, the file sink still writes
        let summary = dispatcher.dispatch(&Report::new("hello\n"));
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
