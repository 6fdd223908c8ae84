//! `crash` command implementation.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::build_reporter;
use crate::cli::CrashArgs;

/// Execute the `crash` command
pub async fn run_crash(args: &CrashArgs) -> Result<()> {
    let reporter = build_reporter(&args.dispatch)?;
    let hook = reporter.install_panic_hook();

    let message = args.message.clone();
    let worker = thread::Builder::new()
        .name("crash-worker".to_string())
        .spawn(move || panic!("{message}"))
        .context("Failed to spawn crash worker")?;

    if worker.join().is_err() {
        info!("Crash worker panicked as requested");
    }

    let settled = reporter
        .settle(Duration::from_secs(args.dispatch.timeout))
        .await;
    hook.uninstall();

    print!("{}", reporter.stats());

    if !settled {
        warn!(in_flight = reporter.in_flight(), "Dispatch still running");
        anyhow::bail!("Timed out waiting for report delivery");
    }
    Ok(())
}
