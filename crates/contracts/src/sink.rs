//! ReportSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use std::sync::Arc;

use crate::{ContractError, Report};

/// Report delivery trait
///
/// All sink implementations must implement this trait. Sinks are invoked from
/// the background dispatch context, never from the thread that built them, and
/// several dispatches may call the same sink concurrently.
pub trait ReportSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one report
    ///
    /// # Errors
    /// - [`ContractError::SinkConfiguration`] when a required field is unset
    /// - [`ContractError::SinkDelivery`] / [`ContractError::Io`] when the transport fails
    fn deliver(&self, report: &Report) -> Result<(), ContractError>;
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn deliver(&self, report: &Report) -> Result<(), ContractError> {
        (**self).deliver(report)
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn deliver(&self, report: &Report) -> Result<(), ContractError> {
        (**self).deliver(report)
    }
}
