//! Background execution context for report building and dispatch

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::CaptureError;

/// Runs dispatch jobs on a tokio blocking pool.
///
/// Borrows the host's runtime when one is supplied or current, otherwise
/// owns a small dedicated runtime.
pub(crate) struct Executor {
    handle: Handle,
    owned: Option<Runtime>,
}

impl Executor {
    pub(crate) fn new(handle: Option<Handle>, worker_threads: usize) -> Result<Self, CaptureError> {
        if let Some(handle) = handle.or_else(|| Handle::try_current().ok()) {
            debug!("Dispatching on the host runtime");
            return Ok(Self {
                handle,
                owned: None,
            });
        }

        let threads = worker_threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .max_blocking_threads(threads)
            .thread_name("bug-reporter")
            .enable_all()
            .build()
            .map_err(CaptureError::Runtime)?;
        debug!(worker_threads = threads, "Started dedicated dispatch runtime");

        Ok(Self {
            handle: runtime.handle().clone(),
            owned: Some(runtime),
        })
    }

    pub(crate) fn owns_runtime(&self) -> bool {
        self.owned.is_some()
    }

    pub(crate) fn spawn_blocking<F, R>(&self, job: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle.spawn_blocking(job)
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Never blocks, safe from async contexts
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}
