//! Unhandled and UI-thread capture channels
//!
//! The panic hook converts any panic into a `CapturedError` with a forced
//! backtrace. Inside [`ErrorReporter::guard_ui`] the hook only stashes the
//! error for the guard, which reports it once on the UI channel.

use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::Arc;

use contracts::{CaptureChannel, CapturedError};
use tracing::{debug, warn};

use crate::reporter::{current_thread_name, ErrorReporter};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

thread_local! {
    static UI_DEPTH: Cell<usize> = const { Cell::new(0) };
    static UI_STASH: RefCell<Option<CapturedError>> = const { RefCell::new(None) };
    static IN_DISPATCH: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as building or delivering a report.
///
/// Panics raised here are left to the dispatcher's per-sink guard and are
/// never captured again.
pub(crate) struct DispatchScope {
    outer: bool,
}

impl DispatchScope {
    pub(crate) fn enter() -> Self {
        Self {
            outer: IN_DISPATCH.with(|flag| flag.replace(true)),
        }
    }

    pub(crate) fn active() -> bool {
        IN_DISPATCH.with(Cell::get)
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        IN_DISPATCH.with(|flag| flag.set(self.outer));
    }
}

/// Marks the current thread as running a guarded UI callback
struct UiScope;

impl UiScope {
    fn enter() -> Self {
        UI_DEPTH.with(|depth| {
            if depth.get() == 0 {
                UI_STASH.with(|stash| stash.borrow_mut().take());
            }
            depth.set(depth.get() + 1);
        });
        UiScope
    }

    fn active() -> bool {
        UI_DEPTH.with(|depth| depth.get() > 0)
    }

    fn stash(error: CapturedError) {
        UI_STASH.with(|stash| *stash.borrow_mut() = Some(error));
    }

    fn take_stashed() -> Option<CapturedError> {
        UI_STASH.with(|stash| stash.borrow_mut().take())
    }
}

impl Drop for UiScope {
    fn drop(&mut self) {
        UI_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Restores the previous panic hook when dropped.
///
/// Guards must be dropped in reverse installation order.
#[must_use = "dropping the guard uninstalls the panic hook"]
pub struct PanicHookGuard {
    previous: Option<Arc<PanicHook>>,
}

impl PanicHookGuard {
    /// Restore the previous hook now
    pub fn uninstall(mut self) {
        self.restore();
    }

    /// Keep the reporter's hook for the rest of the process
    pub fn leak(mut self) {
        self.previous = None;
    }

    fn restore(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        // set_hook panics while unwinding
        if std::thread::panicking() {
            warn!("Panic hook left installed, thread is unwinding");
            return;
        }
        panic::set_hook(Box::new(move |info| (*previous)(info)));
        debug!("Panic hook uninstalled");
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

impl ErrorReporter {
    /// Route every panic in the process through this reporter.
    ///
    /// The previously installed hook still runs afterwards, except for
    /// panics raised inside [`guard_ui`](Self::guard_ui). Panics raised while
    /// a report is being built or delivered only reach the previous hook.
    pub fn install_panic_hook(&self) -> PanicHookGuard {
        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
        let chained = Arc::clone(&previous);
        let reporter = self.clone();

        panic::set_hook(Box::new(move |info| {
            if DispatchScope::active() {
                (*chained)(info);
                return;
            }

            let location = info.location().map(|l| l.to_string());
            let backtrace = Backtrace::force_capture().to_string();
            let captured = CapturedError::from_panic(info.payload(), location, Some(backtrace))
                .with_thread(current_thread_name());

            if UiScope::active() {
                UiScope::stash(captured);
                return;
            }

            reporter.handle(captured.on_channel(CaptureChannel::Unhandled));
            (*chained)(info);
        }));

        debug!(app = %self.app().source_name(), "Panic hook installed");
        PanicHookGuard {
            previous: Some(previous),
        }
    }

    /// Run one UI callback, reporting its failure on the UI channel.
    ///
    /// An `Err` or a panic is captured and swallowed; `None` is returned in
    /// both cases.
    pub fn guard_ui<T, E, F>(&self, callback: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::error::Error + 'static,
    {
        let scope = UiScope::enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(callback));
        drop(scope);

        let captured = match outcome {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(error)) => {
                CapturedError::from_error(&error).with_thread(current_thread_name())
            }
            Err(payload) => UiScope::take_stashed().unwrap_or_else(|| {
                CapturedError::from_panic(&*payload, None, None)
                    .with_thread(current_thread_name())
            }),
        };

        debug!(kind = %captured.kind(), "UI callback failed");
        self.handle(captured.on_channel(CaptureChannel::UiThread));
        None
    }
}
