//! ErrorReporter - notification policy, background build and dispatch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use contracts::{
    AppIdentity, CaptureChannel, CapturedError, NotificationPolicy, ReportSink, ReporterConfig,
};
use diagnostics::{EnvironmentProbe, ReportBuilder, SnapshotCollector};
use dispatcher::{create_sink, DispatchSummary, Dispatcher};
use observability::DispatchStats;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::error::CaptureError;
use crate::executor::Executor;
use crate::hook::DispatchScope;
use crate::prompt::{ask_text, inform_text, ConsentPrompt, TerminalPrompt};

/// Result of handling one captured error
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The user declined under the Ask policy; nothing was built or sent
    Declined,
    /// Build and dispatch were scheduled in the background
    Scheduled(DispatchHandle),
}

impl CaptureOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled(_))
    }

    pub fn into_handle(self) -> Option<DispatchHandle> {
        match self {
            Self::Declined => None,
            Self::Scheduled(handle) => Some(handle),
        }
    }
}

/// Completion of one background dispatch.
///
/// Dropping it does not cancel the dispatch.
#[derive(Debug)]
pub struct DispatchHandle {
    done: oneshot::Receiver<DispatchSummary>,
}

impl DispatchHandle {
    /// Wait for the dispatch from async code
    pub async fn join(self) -> Result<DispatchSummary, CaptureError> {
        self.done
            .await
            .map_err(|_| CaptureError::dispatch("dispatch task was dropped"))
    }

    /// Wait for the dispatch from a thread outside any runtime
    pub fn wait(self) -> Result<DispatchSummary, CaptureError> {
        self.done
            .blocking_recv()
            .map_err(|_| CaptureError::dispatch("dispatch task was dropped"))
    }
}

/// Counts dispatches still running and aggregates finished ones
#[derive(Debug, Default)]
struct DispatchTracker {
    in_flight: AtomicUsize,
    stats: Mutex<DispatchStats>,
}

impl DispatchTracker {
    fn begin(self: &Arc<Self>) -> PendingDispatch {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        PendingDispatch {
            tracker: Arc::clone(self),
        }
    }

    fn finish(&self, summary: &DispatchSummary, elapsed: Duration) {
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        observability::record_dispatch_duration_ms(duration_ms);
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(summary.delivered, summary.failed, duration_ms);
    }
}

/// Decrements the in-flight count when dropped, whether or not the job ran
struct PendingDispatch {
    tracker: Arc<DispatchTracker>,
}

impl Drop for PendingDispatch {
    fn drop(&mut self) {
        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Inner {
    app: AppIdentity,
    policy: RwLock<NotificationPolicy>,
    prompt: Box<dyn ConsentPrompt>,
    probe: Arc<dyn EnvironmentProbe>,
    dispatcher: Arc<Dispatcher>,
    tracker: Arc<DispatchTracker>,
    executor: Executor,
}

/// Process-wide error reporter.
///
/// Cheap to clone; all clones share the sink registry and policy.
#[derive(Clone)]
pub struct ErrorReporter {
    inner: Arc<Inner>,
}

impl ErrorReporter {
    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::default()
    }

    /// Build a reporter from a loaded configuration, using the terminal prompt
    pub fn from_config(config: &ReporterConfig) -> Result<Self, CaptureError> {
        Self::builder().with_config(config)?.build()
    }

    pub fn app(&self) -> &AppIdentity {
        &self.inner.app
    }

    /// Append a sink. Used by reports scheduled after this call.
    pub fn add_sink(&self, sink: Box<dyn ReportSink>) {
        self.inner.dispatcher.add_sink(sink);
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.inner.dispatcher.sink_names()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Takes effect on the next capture
    pub fn set_notification_policy(&self, policy: NotificationPolicy) {
        *self
            .inner
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = policy;
        debug!(policy = %policy, "Notification policy changed");
    }

    pub fn notification_policy(&self) -> NotificationPolicy {
        *self
            .inner
            .policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Report an error the host caught itself
    pub fn log_error(&self, error: &(dyn std::error::Error + 'static)) -> CaptureOutcome {
        self.log_exception(CapturedError::from_dyn_error(error))
    }

    /// Report an already captured error on the manual channel
    pub fn log_exception(&self, error: CapturedError) -> CaptureOutcome {
        let error = match error.thread() {
            Some(_) => error,
            None => error.with_thread(current_thread_name()),
        };
        self.handle(error.on_channel(CaptureChannel::Manual))
    }

    /// Apply the notification policy, then schedule build and dispatch.
    ///
    /// Returns as soon as the decision is made; the report is built on the
    /// background context.
    #[instrument(
        name = "reporter_handle",
        skip(self, error),
        fields(channel = error.channel().as_str(), kind = %error.kind())
    )]
    pub fn handle(&self, error: CapturedError) -> CaptureOutcome {
        let policy = self.notification_policy();
        observability::record_capture(error.channel(), policy);

        match policy {
            NotificationPolicy::Ask => {
                if !self.inner.prompt.ask(&ask_text(error.message())) {
                    info!(channel = error.channel().as_str(), "User declined to send report");
                    observability::record_declined(error.channel());
                    return CaptureOutcome::Declined;
                }
            }
            NotificationPolicy::Inform => self.inner.prompt.inform(&inform_text(error.message())),
            NotificationPolicy::Silent => {}
        }

        CaptureOutcome::Scheduled(self.schedule(error))
    }

    fn schedule(&self, error: CapturedError) -> DispatchHandle {
        let (done_tx, done_rx) = oneshot::channel();
        let pending = self.inner.tracker.begin();
        let tracker = Arc::clone(&self.inner.tracker);
        let dispatcher = Arc::clone(&self.inner.dispatcher);
        let probe = Arc::clone(&self.inner.probe);
        let app = self.inner.app.clone();

        self.inner.executor.spawn_blocking(move || {
            let _pending = pending;
            let _scope = DispatchScope::enter();
            let started = Instant::now();

            let snapshot = probe.snapshot(&app);
            let report = ReportBuilder::build(&error, &snapshot);
            let summary = dispatcher.dispatch(&report);

            tracker.finish(&summary, started.elapsed());
            if summary.failed > 0 {
                warn!(
                    failed = summary.failed,
                    attempted = summary.attempted,
                    "Report not delivered to every sink"
                );
            }
            // Receiver may be gone, the automatic channels never keep it
            let _ = done_tx.send(summary);
        });

        DispatchHandle { done: done_rx }
    }

    /// Dispatches scheduled but not yet finished
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no dispatch is running, up to `timeout`.
    ///
    /// Returns `false` on timeout.
    pub async fn settle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.in_flight() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Aggregate of finished dispatches
    pub fn stats(&self) -> DispatchStats {
        self.inner
            .tracker
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("app", &self.inner.app)
            .field("policy", &self.notification_policy())
            .field("sinks", &self.sink_names())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Builder for [`ErrorReporter`]
pub struct ReporterBuilder {
    app: Option<AppIdentity>,
    policy: NotificationPolicy,
    prompt: Option<Box<dyn ConsentPrompt>>,
    runtime: Option<Handle>,
    worker_threads: usize,
    probe: Option<Arc<dyn EnvironmentProbe>>,
    sinks: Vec<Box<dyn ReportSink>>,
}

impl Default for ReporterBuilder {
    fn default() -> Self {
        Self {
            app: None,
            policy: NotificationPolicy::default(),
            prompt: None,
            runtime: None,
            worker_threads: 2,
            probe: None,
            sinks: Vec::new(),
        }
    }
}

impl ReporterBuilder {
    pub fn app(mut self, app: AppIdentity) -> Self {
        self.app = Some(app);
        self
    }

    pub fn notification(mut self, policy: NotificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn prompt(mut self, prompt: impl ConsentPrompt + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Dispatch on this runtime instead of the current or a dedicated one
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Worker count of the dedicated runtime, when one is needed
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn probe(mut self, probe: impl EnvironmentProbe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    pub fn sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn boxed_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Take identity, policy, pool size and sinks from a configuration
    pub fn with_config(mut self, config: &ReporterConfig) -> Result<Self, CaptureError> {
        for sink_config in &config.sinks {
            self.sinks.push(create_sink(sink_config, &config.app)?);
        }
        self.app = Some(config.app.clone());
        self.policy = config.notification;
        self.worker_threads = config.worker_threads;
        Ok(self)
    }

    pub fn build(self) -> Result<ErrorReporter, CaptureError> {
        let app = self.app.unwrap_or_default();
        let executor = Executor::new(self.runtime, self.worker_threads)?;

        let dispatcher = Dispatcher::new();
        for sink in self.sinks {
            dispatcher.add_sink(sink);
        }

        info!(
            app = %app.source_name(),
            policy = %self.policy,
            sinks = dispatcher.len(),
            dedicated_runtime = executor.owns_runtime(),
            "Error reporter ready"
        );

        Ok(ErrorReporter {
            inner: Arc::new(Inner {
                app,
                policy: RwLock::new(self.policy),
                prompt: self.prompt.unwrap_or_else(|| Box::new(TerminalPrompt::new())),
                probe: self
                    .probe
                    .unwrap_or_else(|| Arc::new(SnapshotCollector::new())),
                dispatcher: Arc::new(dispatcher),
                tracker: Arc::new(DispatchTracker::default()),
                executor,
            }),
        })
    }
}

pub(crate) fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
