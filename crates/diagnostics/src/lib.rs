//! # Diagnostics
//!
//! Environment snapshotting and report rendering.
//!
//! Responsibilities:
//! - Collect a `DiagnosticSnapshot` (host, OS, uptime, memory, loaded modules)
//! - Render a `CapturedError` plus snapshot into a text `Report`

mod builder;
mod modules;
mod snapshot;

pub use builder::{format_duration, message_chain, trace_chain, type_chain, ReportBuilder, NEXT_FRAME_MARKER};
pub use modules::{loaded_modules, LoadedModule};
pub use snapshot::{DiagnosticSnapshot, EnvironmentProbe, MemoryStats, SnapshotCollector};
