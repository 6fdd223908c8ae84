//! `report` command implementation.

use std::backtrace::Backtrace;
use std::time::Duration;

use anyhow::{Context, Result};
use capture::CaptureOutcome;
use contracts::CapturedError;
use dispatcher::DispatchSummary;
use serde::Serialize;
use tracing::info;

use super::build_reporter;
use crate::cli::ReportArgs;

/// Dispatch result for JSON output
#[derive(Serialize)]
struct ReportResult {
    sent: bool,
    attempted: usize,
    delivered: usize,
    failed: usize,
    sinks: Vec<SinkResult>,
}

#[derive(Serialize)]
struct SinkResult {
    name: String,
    delivered: u64,
    failed: u64,
}

/// Execute the `report` command
pub async fn run_report(args: &ReportArgs) -> Result<()> {
    let reporter = build_reporter(&args.dispatch)?;
    let error = build_error(&args.kind, &args.message, &args.causes);

    info!(depth = error.depth(), kind = %error.kind(), "Reporting error");

    let summary = match reporter.log_exception(error) {
        CaptureOutcome::Declined => None,
        CaptureOutcome::Scheduled(handle) => {
            let timeout = Duration::from_secs(args.dispatch.timeout);
            let summary = tokio::time::timeout(timeout, handle.join())
                .await
                .context("Timed out waiting for report delivery")??;
            Some(summary)
        }
    };

    let sinks = reporter
        .dispatcher()
        .metrics()
        .into_iter()
        .map(|(name, snap)| SinkResult {
            name,
            delivered: snap.delivered_count,
            failed: snap.failure_count,
        })
        .collect();

    if args.json {
        let summary_or_default = summary.unwrap_or_default();
        let result = ReportResult {
            sent: summary.is_some(),
            attempted: summary_or_default.attempted,
            delivered: summary_or_default.delivered,
            failed: summary_or_default.failed,
            sinks,
        };
        let json =
            serde_json::to_string_pretty(&result).context("Failed to serialize report result")?;
        println!("{}", json);
    } else {
        print_summary(summary, &sinks);
    }

    Ok(())
}

/// Outermost error with a nested cause per `--cause`, outermost first
fn build_error(kind: &str, message: &str, causes: &[String]) -> CapturedError {
    let inner = causes
        .iter()
        .rev()
        .fold(None, |inner: Option<CapturedError>, cause| {
            let layer = CapturedError::new("Cause", cause.as_str());
            Some(match inner {
                Some(inner) => layer.caused_by(inner),
                None => layer,
            })
        });

    let outer = CapturedError::new(kind, message)
        .with_trace(Backtrace::force_capture().to_string());
    match inner {
        Some(inner) => outer.caused_by(inner),
        None => outer,
    }
}

fn print_summary(summary: Option<DispatchSummary>, sinks: &[SinkResult]) {
    let Some(summary) = summary else {
        println!("✗ Report declined, nothing was sent");
        return;
    };

    if summary.failed == 0 {
        println!("✓ Report delivered to {} sink(s)", summary.delivered);
    } else {
        println!(
            "⚠ Report delivered to {} of {} sink(s)",
            summary.delivered, summary.attempted
        );
    }

    for (i, sink) in sinks.iter().enumerate() {
        let prefix = if i == sinks.len() - 1 { "└─" } else { "├─" };
        let status = if sink.failed > 0 { "failed" } else { "ok" };
        println!("   {} {} ({})", prefix, sink.name, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_nests_causes_in_order() {
        let causes = vec!["disk full".to_string(), "quota exceeded".to_string()];
        let error = build_error("SaveError", "save failed", &causes);

        let messages: Vec<&str> = error.chain().map(CapturedError::message).collect();
        assert_eq!(messages, vec!["save failed", "disk full", "quota exceeded"]);
        assert_eq!(error.kind(), "SaveError");
        assert!(error.trace().is_some());
        assert_eq!(error.root_cause().kind(), "Cause");
    }

    #[test]
    fn test_build_error_without_causes() {
        let error = build_error("ManualReport", "hello", &[]);
        assert_eq!(error.depth(), 1);
    }
}
