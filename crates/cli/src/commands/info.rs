//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{NotificationPolicy, ReporterConfig};
use diagnostics::{format_duration, DiagnosticSnapshot, SnapshotCollector};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

const MIB: u64 = 1024 * 1024;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    app: String,
    version: String,
    notification: NotificationPolicy,
    worker_threads: usize,
    sinks: Vec<SinkInfo>,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    params: Vec<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    host_name: String,
    user_name: String,
    os: String,
    locale: String,
    system_uptime: String,
    process_uptime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_memory_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_memory_mb: Option<u64>,
    module_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    modules: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;
    let snapshot = SnapshotCollector::new().collect(&config.app);

    if args.json {
        let info = build_config_info(&config, &snapshot, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, &snapshot, args);
    }

    Ok(())
}

fn build_config_info(
    config: &ReporterConfig,
    snapshot: &DiagnosticSnapshot,
    args: &InfoArgs,
) -> ConfigInfo {
    let sinks = config
        .sinks
        .iter()
        .map(|s| {
            let mut params: Vec<String> = s.params.keys().cloned().collect();
            params.sort();
            SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                params,
            }
        })
        .collect();

    let modules = if args.modules {
        snapshot
            .modules
            .iter()
            .map(|m| format!("{} {}", m.path, m.version))
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        app: config.app.name.clone(),
        version: config.app.version.clone(),
        notification: config.notification,
        worker_threads: config.worker_threads,
        sinks,
        environment: EnvironmentInfo {
            host_name: snapshot.host_name.clone(),
            user_name: snapshot.user_name.clone(),
            os: snapshot.os.clone(),
            locale: snapshot.locale.clone(),
            system_uptime: format_duration(snapshot.system_uptime),
            process_uptime: format_duration(snapshot.process_uptime),
            total_memory_mb: snapshot.memory.map(|m| m.total_bytes / MIB),
            available_memory_mb: snapshot.memory.map(|m| m.available_bytes / MIB),
            module_count: snapshot.modules.len(),
            modules,
        },
    }
}

fn print_config_info(config: &ReporterConfig, snapshot: &DiagnosticSnapshot, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Bug Reporter Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📦 Application");
    println!("   ├─ Name: {}", config.app.name);
    println!("   ├─ Version: {}", config.app.version);
    println!("   ├─ Notification: {}", config.notification);
    println!("   └─ Worker threads: {}", config.worker_threads);

    println!("\n📤 Sinks ({})", config.sinks.len());
    for (i, sink) in config.sinks.iter().enumerate() {
        let prefix = if i == config.sinks.len() - 1 { "└─" } else { "├─" };
        println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
    }

    println!("\n🖥  Environment");
    println!("   ├─ Computer: {}", snapshot.host_name);
    println!("   ├─ User: {}", snapshot.user_name);
    println!("   ├─ OS: {}", snapshot.os);
    println!("   ├─ Culture: {}", snapshot.locale);
    println!("   ├─ System up time: {}", format_duration(snapshot.system_uptime));
    if let Some(memory) = snapshot.memory {
        println!(
            "   ├─ Memory: {}Mb available of {}Mb",
            memory.available_bytes / MIB,
            memory.total_bytes / MIB
        );
    }
    println!("   └─ Loaded modules: {}", snapshot.modules.len());

    if args.modules {
        for module in &snapshot.modules {
            println!("      {} {}", module.path, module.version);
        }
    }

    println!();
}
