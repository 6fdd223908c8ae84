//! Report rendering
//!
//! Header from the snapshot, then the type, message and stack trace chains
//! (innermost cause first), then the loaded module listing.

use std::fmt::Write;
use std::time::Duration;

use contracts::{CapturedError, Report};

use crate::snapshot::DiagnosticSnapshot;

/// Separator between consecutive stack traces
pub const NEXT_FRAME_MARKER: &str = "--- Next Call Stack:";

const LABEL_WIDTH: usize = 19;
const MIB: u64 = 1024 * 1024;

/// Renders reports
pub struct ReportBuilder;

impl ReportBuilder {
    /// Render one report. Pure apart from the snapshot it is given.
    pub fn build(error: &CapturedError, snapshot: &DiagnosticSnapshot) -> Report {
        let mut out = String::new();

        write_header(&mut out, snapshot);
        out.push('\n');

        out.push_str("Exception classes:\n");
        out.push_str(&type_chain(error));
        out.push('\n');

        out.push_str("Exception messages:\n");
        out.push_str(&message_chain(error));
        out.push('\n');

        out.push_str("Stack Traces:\n");
        out.push_str(&trace_chain(error));
        out.push('\n');

        out.push_str("Loaded Modules:\n");
        for module in &snapshot.modules {
            let _ = writeln!(out, "{} {}", module.path, module.version);
        }

        Report::new(out)
    }
}

fn write_header(out: &mut String, s: &DiagnosticSnapshot) {
    let display = s.display.as_deref().unwrap_or("unknown");
    let date = s.timestamp.format("%d/%m/%Y %H:%M:%S").to_string();

    field(out, "Application:", &s.app.name);
    field(out, "Version:", &s.app.version);
    field(out, "Date:", &date);
    field(out, "Computer name:", &s.host_name);
    field(out, "User name:", &s.user_name);
    field(out, "OS:", &s.os);
    field(out, "Culture:", &s.locale);
    field(out, "Resolution:", display);
    field(out, "System up time:", &format_duration(s.system_uptime));
    field(out, "App up time:", &format_duration(s.process_uptime));

    if let Some(memory) = s.memory {
        field(out, "Total memory:", &format!("{}Mb", memory.total_bytes / MIB));
        field(
            out,
            "Available memory:",
            &format!("{}Mb", memory.available_bytes / MIB),
        );
    }
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{label:<LABEL_WIDTH$}{value}");
}

/// One indented line per layer, innermost first
pub fn type_chain(error: &CapturedError) -> String {
    indented_chain(error, CapturedError::kind)
}

/// One indented line per layer, innermost first
pub fn message_chain(error: &CapturedError) -> String {
    indented_chain(error, CapturedError::message)
}

fn indented_chain(error: &CapturedError, pick: fn(&CapturedError) -> &str) -> String {
    let layers: Vec<_> = error.chain().collect();
    let mut out = String::new();
    for layer in layers.into_iter().rev() {
        let _ = writeln!(out, "   {}", pick(layer));
    }
    out
}

/// Innermost trace first; each outer trace follows a [`NEXT_FRAME_MARKER`] line
pub fn trace_chain(error: &CapturedError) -> String {
    let layers: Vec<_> = error.chain().collect();
    let mut out = String::new();
    for (idx, layer) in layers.into_iter().rev().enumerate() {
        if idx > 0 {
            out.push_str(NEXT_FRAME_MARKER);
            out.push('\n');
        }
        let trace = layer.trace().unwrap_or("");
        out.push_str(trace);
        if !trace.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// `[d.]hh:mm:ss`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
