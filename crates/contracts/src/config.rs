//! ReporterConfig - Config Loader output
//!
//! Describes the reporting setup: application identity, notification policy,
//! background pool size and the ordered list of sinks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::NotificationPolicy;

/// Substitution slot the HTTP sink replaces with the URL-encoded report
pub const REPORT_SLOT: &str = "{report}";

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Identity printed in the report header
    #[serde(default)]
    pub app: AppIdentity,

    /// User interaction before dispatch
    #[serde(default)]
    pub notification: NotificationPolicy,

    /// Size of the background dispatch pool
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Sinks, in delivery order
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

fn default_worker_threads() -> usize {
    2
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::default(),
            app: AppIdentity::default(),
            notification: NotificationPolicy::default(),
            worker_threads: default_worker_threads(),
            sinks: Vec::new(),
        }
    }
}

/// Application identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Product name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Product version
    #[serde(default = "default_app_version")]
    pub version: String,
}

fn default_app_name() -> String {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "application".to_string())
}

fn default_app_version() -> String {
    "unknown".to_string()
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

impl AppIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Identity string of the running module, used as event source name
    pub fn source_name(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    pub fn new(name: impl Into<String>, sink_type: SinkType) -> Self {
        Self {
            name: name.into(),
            sink_type,
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parameter value, treating empty strings as unset
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Names of required parameters that are unset
    pub fn missing_params(&self) -> Vec<&'static str> {
        self.sink_type
            .required_params()
            .iter()
            .copied()
            .filter(|key| self.param(key).is_none())
            .collect()
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Rolling text file next to the binary
    File,
    /// OS event log (syslog on Unix, Application log on Windows)
    EventLog,
    /// Mail relay
    Mail,
    /// Form-encoded HTTP POST
    Http,
}

impl SinkType {
    /// Parameters that must be set before first delivery
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::File | Self::EventLog => &[],
            Self::Mail => &["from", "to", "server"],
            Self::Http => &["url", "query"],
        }
    }
}
