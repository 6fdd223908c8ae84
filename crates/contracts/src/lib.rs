//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bug reporter.
//! All business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data flow
//! - the capture layer turns panics and errors into a [`CapturedError`]
//! - the report builder renders it, together with a diagnostic snapshot, into a [`Report`]
//! - the dispatcher hands the same [`Report`] to every registered [`ReportSink`]

mod captured;
mod config;
mod error;
mod policy;
mod report;
mod sink;

pub use captured::*;
pub use config::*;
pub use error::*;
pub use policy::NotificationPolicy;
pub use report::Report;
pub use sink::ReportSink;
