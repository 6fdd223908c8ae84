//! EventLogSink - operating system event log
//!
//! Unix: RFC 3164 datagrams on the local syslog socket, split on line
//! boundaries so none exceeds [`MAX_DATAGRAM`] bytes.
//! Windows: an error entry in the Application event log.

use contracts::{AppIdentity, ContractError, Report, ReportSink};
use std::collections::HashMap;
#[cfg(unix)]
use std::path::PathBuf;
use tracing::{debug, instrument};

use super::string_param;

#[cfg(unix)]
const DEFAULT_SOCKET: &str = "/dev/log";

/// Largest syslog datagram sent, header included
pub const MAX_DATAGRAM: usize = 2048;

/// Configuration for EventLogSink
#[derive(Debug, Clone)]
pub struct EventLogSinkConfig {
    /// Event source, `"<product> <version>"` unless overridden
    pub source: String,
    /// Syslog socket path
    #[cfg(unix)]
    pub socket_path: PathBuf,
}

impl EventLogSinkConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            #[cfg(unix)]
            socket_path: PathBuf::from(DEFAULT_SOCKET),
        }
    }

    /// Create config from params map, falling back to the application identity
    pub fn from_params(params: &HashMap<String, String>, app: &AppIdentity) -> Self {
        let source = string_param(params, "source").unwrap_or_else(|| app.source_name());
        #[allow(unused_mut)]
        let mut config = Self::new(source);
        #[cfg(unix)]
        if let Some(socket) = string_param(params, "socket") {
            config.socket_path = PathBuf::from(socket);
        }
        config
    }

    /// Syslog tag: the source with whitespace replaced
    pub fn tag(&self) -> String {
        self.source
            .chars()
            .map(|c| if c.is_whitespace() { '-' } else { c })
            .collect()
    }
}

/// Sink that records reports as error events in the system log
pub struct EventLogSink {
    name: String,
    config: EventLogSinkConfig,
}

impl EventLogSink {
    pub fn new(name: impl Into<String>, config: EventLogSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        app: &AppIdentity,
    ) -> Self {
        Self::new(name, EventLogSinkConfig::from_params(params, app))
    }

    pub fn source(&self) -> &str {
        &self.config.source
    }

    /// RFC 3164 datagrams at facility user, severity error.
    ///
    /// Every datagram carries the same header and at most [`MAX_DATAGRAM`]
    /// bytes in total.
    pub fn syslog_datagrams(&self, report: &Report) -> Vec<String> {
        let header = format!("<11>{}[{}]: ", self.config.tag(), std::process::id());
        let room = MAX_DATAGRAM.saturating_sub(header.len()).max(1);
        chunk_lines(report.as_str().trim_end(), room)
            .into_iter()
            .map(|chunk| format!("{header}{chunk}"))
            .collect()
    }

    fn delivery_error(&self, e: impl std::fmt::Display) -> ContractError {
        ContractError::sink_delivery(&self.name, e.to_string())
    }

    #[cfg(unix)]
    fn write_entry(&self, report: &Report) -> Result<(), ContractError> {
        use std::os::unix::net::UnixDatagram;

        let socket = UnixDatagram::unbound().map_err(|e| self.delivery_error(e))?;
        socket
            .connect(&self.config.socket_path)
            .map_err(|e| {
                self.delivery_error(format!(
                    "cannot reach {}: {e}",
                    self.config.socket_path.display()
                ))
            })?;
        let datagrams = self.syslog_datagrams(report);
        for datagram in &datagrams {
            socket
                .send(datagram.as_bytes())
                .map_err(|e| self.delivery_error(e))?;
        }
        debug!(sink = %self.name, datagrams = datagrams.len(), "Syslog entry written");
        Ok(())
    }

    #[cfg(windows)]
    fn write_entry(&self, report: &Report) -> Result<(), ContractError> {
        use windows::core::{HSTRING, PCWSTR};
        use windows::Win32::Foundation::PSID;
        use windows::Win32::System::EventLog::{
            DeregisterEventSource, RegisterEventSourceW, ReportEventW, EVENTLOG_ERROR_TYPE,
        };

        let source = HSTRING::from(self.config.source.as_str());
        let message = HSTRING::from(report.as_str());
        let strings = [PCWSTR(message.as_ptr())];

        // SAFETY: every pointer handed to the API outlives the calls below
        unsafe {
            let handle = RegisterEventSourceW(PCWSTR::null(), &source)
                .map_err(|e| self.delivery_error(e))?;
            let written = ReportEventW(
                handle,
                EVENTLOG_ERROR_TYPE,
                0,
                0,
                PSID::default(),
                0,
                Some(&strings),
                None,
            );
            let _ = DeregisterEventSource(handle);
            written.map_err(|e| self.delivery_error(e))?;
        }
        debug!(sink = %self.name, "Event log entry written");
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn write_entry(&self, _report: &Report) -> Result<(), ContractError> {
        Err(self.delivery_error("no event log on this platform"))
    }
}

impl ReportSink for EventLogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "event_log_sink_deliver",
        skip(self, report),
        fields(sink = %self.name, source = %self.config.source)
    )]
    fn deliver(&self, report: &Report) -> Result<(), ContractError> {
        self.write_entry(report)
    }
}

/// Split `text` on line boundaries into chunks of at most `room` bytes.
///
/// A line longer than `room` is cut at char boundaries.
fn chunk_lines(text: &str, room: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Option<String> = None;

    for mut line in text.split('\n') {
        loop {
            if let Some(chunk) = current.as_mut() {
                if chunk.len() + 1 + line.len() <= room {
                    chunk.push('\n');
                    chunk.push_str(line);
                    break;
                }
                chunks.extend(current.take());
                continue;
            }
            if line.len() <= room {
                current = Some(line.to_string());
                break;
            }
            let mut cut = room;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                cut = line.chars().next().map_or(line.len(), char::len_utf8);
            }
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }
    }
    chunks.extend(current);
    chunks
}
