//! Command implementations.

mod crash;
mod info;
mod report;
mod validate;

pub use crash::run_crash;
pub use info::run_info;
pub use report::run_report;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use capture::{ErrorReporter, FixedPrompt, TerminalPrompt};
use contracts::ReporterConfig;
use tracing::info;

use crate::cli::DispatchArgs;

/// Load and validate a configuration file
fn load_config(path: &Path) -> Result<ReporterConfig> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Build the reporter for `report` and `crash`
fn build_reporter(args: &DispatchArgs) -> Result<ErrorReporter> {
    let config = load_config(&args.config)?;
    let mut builder = ErrorReporter::builder()
        .with_config(&config)
        .context("Failed to create sinks")?;

    if let Some(policy) = args.policy {
        builder = builder.notification(policy);
    }

    builder = if args.yes {
        builder.prompt(FixedPrompt::accept())
    } else {
        prompt_for(args, builder)
    };

    let reporter = builder.build().context("Failed to start reporter")?;
    info!(
        app = %reporter.app().source_name(),
        policy = %reporter.notification_policy(),
        sinks = ?reporter.sink_names(),
        "Reporter configured"
    );
    Ok(reporter)
}

#[cfg(feature = "native-dialog")]
fn prompt_for(args: &DispatchArgs, builder: capture::ReporterBuilder) -> capture::ReporterBuilder {
    if args.dialog {
        builder.prompt(capture::DialogPrompt::new("Unexpected error"))
    } else {
        builder.prompt(TerminalPrompt::new())
    }
}

#[cfg(not(feature = "native-dialog"))]
fn prompt_for(_args: &DispatchArgs, builder: capture::ReporterBuilder) -> capture::ReporterBuilder {
    builder.prompt(TerminalPrompt::new())
}
