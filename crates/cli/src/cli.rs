//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::NotificationPolicy;
use std::path::PathBuf;

/// Bug Reporter - unhandled error capture and reporting pipeline
#[derive(Parser, Debug)]
#[command(
    name = "bug-reporter",
    author,
    version,
    about = "Unhandled error capture and reporting pipeline",
    long_about = "Captures unhandled errors, builds a diagnostic report and delivers it\n\
                  to every configured sink (file, event log, mail, HTTP).\n\n\
                  Use `report` to send a hand-built error and `crash` to exercise\n\
                  the panic hook."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BUG_REPORTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "BUG_REPORTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (disabled when unset)
    #[arg(long, global = true, env = "BUG_REPORTER_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    Validate(ValidateArgs),

    /// Display configuration and the current diagnostic snapshot
    Info(InfoArgs),

    /// Send a hand-built error through the reporter
    Report(ReportArgs),

    /// Panic on a worker thread with the panic hook installed
    Crash(CrashArgs),
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bug-reporter.toml", env = "BUG_REPORTER_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bug-reporter.toml", env = "BUG_REPORTER_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List loaded modules
    #[arg(long)]
    pub modules: bool,
}

/// Options shared by the commands that dispatch reports
#[derive(Parser, Debug, Clone)]
pub struct DispatchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bug-reporter.toml", env = "BUG_REPORTER_CONFIG")]
    pub config: PathBuf,

    /// Override the configured notification policy
    #[arg(long)]
    pub policy: Option<NotificationPolicy>,

    /// Answer "yes" to the Ask prompt without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Use a native message box for prompts
    #[cfg(feature = "native-dialog")]
    #[arg(long)]
    pub dialog: bool,

    /// Seconds to wait for delivery to finish
    #[arg(long, default_value = "60")]
    pub timeout: u64,
}

/// Arguments for the `report` command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Kind of the outermost error
    #[arg(long, default_value = "ManualReport")]
    pub kind: String,

    /// Message of the outermost error
    #[arg(short, long, default_value = "Manual error report")]
    pub message: String,

    /// Inner cause message; repeat to nest deeper (outermost first)
    #[arg(long = "cause")]
    pub causes: Vec<String>,

    /// Output the dispatch summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `crash` command
#[derive(Parser, Debug)]
pub struct CrashArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Panic message
    #[arg(short, long, default_value = "simulated crash")]
    pub message: String,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
