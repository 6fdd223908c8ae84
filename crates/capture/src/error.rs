//! Capture error types

use thiserror::Error;

/// Capture-specific errors
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Background runtime could not be started
    #[error("failed to start background runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Dispatch task ended without producing a summary
    #[error("dispatch did not complete: {message}")]
    Dispatch { message: String },

    /// Sink construction error
    #[error(transparent)]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// Contract error
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl CaptureError {
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }
}
