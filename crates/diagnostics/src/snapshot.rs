//! DiagnosticSnapshot - environment facts captured at report-build time

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use contracts::AppIdentity;
use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

use crate::modules::{loaded_modules, LoadedModule};

/// Physical memory statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Flat set of named facts for one report
#[derive(Debug, Clone)]
pub struct DiagnosticSnapshot {
    pub app: AppIdentity,
    pub timestamp: DateTime<Local>,
    pub host_name: String,
    pub user_name: String,
    pub os: String,
    pub locale: String,
    /// Primary display description, supplied by the host application
    pub display: Option<String>,
    pub system_uptime: Duration,
    pub process_uptime: Duration,
    /// Best-effort; `None` when the platform call failed
    pub memory: Option<MemoryStats>,
    pub modules: Vec<LoadedModule>,
}

/// Source of diagnostic snapshots
pub trait EnvironmentProbe: Send + Sync {
    fn snapshot(&self, app: &AppIdentity) -> DiagnosticSnapshot;
}

/// Collects snapshots from the running system
#[derive(Debug, Clone)]
pub struct SnapshotCollector {
    created: Instant,
    display: Option<String>,
}

impl Default for SnapshotCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCollector {
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            display: None,
        }
    }

    /// Set the display description (e.g. `"{Width=1920, Height=1080}"`)
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Collect a snapshot now
    pub fn collect(&self, app: &AppIdentity) -> DiagnosticSnapshot {
        let mut sys = System::new();
        let memory = read_memory(&mut sys);
        let process_uptime = self.process_uptime(&mut sys);

        if memory.is_none() {
            debug!("Memory statistics unavailable, omitting from report");
        }

        DiagnosticSnapshot {
            app: app.clone(),
            timestamp: Local::now(),
            host_name: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            user_name: user_name(),
            os: System::long_os_version()
                .unwrap_or_else(|| std::env::consts::OS.to_string()),
            locale: sys_locale::get_locale().unwrap_or_else(|| "unknown".to_string()),
            display: self.display.clone(),
            system_uptime: Duration::from_secs(System::uptime()),
            process_uptime,
            memory,
            modules: loaded_modules(&app.version),
        }
    }

    /// Uptime from the process table, falling back to collector age
    fn process_uptime(&self, sys: &mut System) -> Duration {
        let started = sysinfo::get_current_pid().ok().and_then(|pid| {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            sys.process(pid).map(|p| p.start_time())
        });

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        match started {
            Some(start) if start > 0 && start <= now => Duration::from_secs(now - start),
            _ => self.created.elapsed(),
        }
    }
}

impl EnvironmentProbe for SnapshotCollector {
    fn snapshot(&self, app: &AppIdentity) -> DiagnosticSnapshot {
        self.collect(app)
    }
}

fn read_memory(sys: &mut System) -> Option<MemoryStats> {
    sys.refresh_memory();
    let total = sys.total_memory();
    (total > 0).then(|| MemoryStats {
        total_bytes: total,
        available_bytes: sys.available_memory(),
    })
}

fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
