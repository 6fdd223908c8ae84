//! FileSink - rolling bug report file next to the binary

use contracts::{ContractError, Report, ReportSink};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, instrument};

use super::{parse_param, string_param};

/// File name used when no path is configured
pub const DEFAULT_FILE_NAME: &str = "BugReport.txt";

/// Prior lines kept before each append
pub const DEFAULT_MAX_LINES: usize = 500;

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Target file
    pub path: PathBuf,
    /// Number of most recent existing lines kept on each write
    pub max_lines: usize,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl FileSinkConfig {
    /// `<application directory>/BugReport.txt`
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_FILE_NAME)
    }

    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = string_param(params, "path")
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_path);
        let max_lines = parse_param(params, "max_lines", DEFAULT_MAX_LINES)?;

        Ok(Self { path, max_lines })
    }
}

/// Sink that appends reports to a text file, trimming older lines
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    /// Held for the whole read-trim-rewrite-append sequence
    write_lock: Mutex<()>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = FileSinkConfig::from_params(params)?;
        Ok(Self::new(name, config))
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Existing content as raw bytes; the file may hold text in any encoding
    fn read_existing(&self) -> io::Result<Vec<u8>> {
        match fs::read(&self.config.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Kept lines are written back byte for byte, line endings included.
    fn rewrite_with(&self, report: &Report) -> io::Result<()> {
        let existing = self.read_existing()?;
        let lines: Vec<&[u8]> = existing.split_inclusive(|&b| b == b'\n').collect();
        let keep_from = lines.len().saturating_sub(self.config.max_lines);

        let kept = &lines[keep_from..];

        let mut out = BufWriter::new(File::create(&self.config.path)?);
        for line in kept {
            out.write_all(line)?;
        }
        if kept.last().is_some_and(|line| !line.ends_with(b"\n")) {
            out.write_all(b"\n")?;
        }
        out.write_all(report.as_str().as_bytes())?;
        out.flush()?;

        debug!(
            sink = %self.name,
            kept = kept.len(),
            dropped = keep_from,
            "Bug report file rewritten"
        );
        Ok(())
    }
}

impl ReportSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_deliver",
        skip(self, report),
        fields(sink = %self.name, path = %self.config.path.display())
    )]
    fn deliver(&self, report: &Report) -> Result<(), ContractError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.rewrite_with(report).map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_delivery(&self.name, e.to_string())
        })
    }
}
