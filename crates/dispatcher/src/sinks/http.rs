//! HttpSink - form-encoded POST of the report

use contracts::{ContractError, Report, ReportSink, REPORT_SLOT};
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};
use url::form_urlencoded;

use super::{parse_param, string_param};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Configuration for HttpSink
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Destination URL
    pub url: Option<String>,
    /// Body template holding one `{report}` slot, e.g. `error={report}`
    pub query: Option<String>,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            query: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        Ok(Self {
            url: string_param(params, "url"),
            query: string_param(params, "query"),
            timeout: Duration::from_secs(parse_param(params, "timeout_secs", 30u64)?),
        })
    }
}

/// URL-encode `text` into the template's report slot
pub fn encode_body(template: &str, text: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
    template.replacen(REPORT_SLOT, &encoded, 1)
}

/// Sink that posts reports to a web endpoint
pub struct HttpSink {
    name: String,
    config: HttpSinkConfig,
}

impl HttpSink {
    pub fn new(name: impl Into<String>, config: HttpSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        Ok(Self::new(name, HttpSinkConfig::from_params(params)?))
    }

    /// Check required fields, returning `(url, query)`
    fn required(&self) -> Result<(&str, &str), ContractError> {
        let url = self
            .config
            .url
            .as_deref()
            .ok_or_else(|| ContractError::sink_configuration(&self.name, "url"))?;
        let query = self
            .config
            .query
            .as_deref()
            .ok_or_else(|| ContractError::sink_configuration(&self.name, "query"))?;
        if query.matches(REPORT_SLOT).count() != 1 {
            return Err(ContractError::sink_configuration(
                &self.name,
                format!("query slot {REPORT_SLOT}"),
            ));
        }
        Ok((url, query))
    }

    /// Encoded request body for a report
    pub fn request_body(&self, report: &Report) -> Result<String, ContractError> {
        let (_, query) = self.required()?;
        Ok(encode_body(query, report.as_str()))
    }

    fn delivery_error(&self, e: impl std::fmt::Display) -> ContractError {
        ContractError::sink_delivery(&self.name, e.to_string())
    }
}

impl ReportSink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "http_sink_deliver", skip(self, report), fields(sink = %self.name))]
    fn deliver(&self, report: &Report) -> Result<(), ContractError> {
        let (url, query) = self.required()?;
        let body = encode_body(query, report.as_str());

        // Built per call: a blocking client must not be created or dropped on an async thread
        let client = reqwest::blocking::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| self.delivery_error(e))?;

        let response = client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .map_err(|e| self.delivery_error(e))?;

        let status = response.status();
        // Drain the body so the exchange completes
        let drained = response.bytes().map_err(|e| self.delivery_error(e))?;
        debug!(sink = %self.name, %status, response_bytes = drained.len(), "POST completed");

        if !status.is_success() {
            return Err(self.delivery_error(format!("server answered {status}")));
        }
        Ok(())
    }
}
