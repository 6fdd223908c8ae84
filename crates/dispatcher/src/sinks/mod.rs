//! Sink implementations
//!
//! Contains FileSink, EventLogSink, MailSink and HttpSink.

mod event_log;
mod file;
mod http;
mod mail;

pub use self::event_log::{EventLogSink, EventLogSinkConfig};
pub use self::file::{FileSink, FileSinkConfig, DEFAULT_FILE_NAME, DEFAULT_MAX_LINES};
pub use self::http::{encode_body, HttpSink, HttpSinkConfig};
pub use self::mail::{MailSink, MailSinkConfig, DEFAULT_SUBJECT};

use std::collections::HashMap;
use std::str::FromStr;

use contracts::ContractError;

/// Parse an optional numeric parameter
fn parse_param<T: FromStr>(
    params: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ContractError> {
    match params.get(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|_| {
            ContractError::config_validation(key, format!("invalid value '{raw}'"))
        }),
        None => Ok(default),
    }
}

/// Non-empty parameter as owned string
fn string_param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}
