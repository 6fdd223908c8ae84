//! MailSink - plain-text report over SMTP

use contracts::{ContractError, Report, ReportSink};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{parse_param, string_param};

/// Subject used when none is configured
pub const DEFAULT_SUBJECT: &str = "Unhandled exception report";

const DEFAULT_PORT: u16 = 25;
const SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for MailSink
#[derive(Debug, Clone)]
pub struct MailSinkConfig {
    pub from: Option<String>,
    /// One or more recipients separated by `,` or `;`
    pub to: Option<String>,
    /// SMTP relay host
    pub server: Option<String>,
    pub subject: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MailSinkConfig {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            server: None,
            subject: DEFAULT_SUBJECT.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
        }
    }
}

impl MailSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        Ok(Self {
            from: string_param(params, "from"),
            to: string_param(params, "to"),
            server: string_param(params, "server"),
            subject: string_param(params, "subject").unwrap_or_else(|| DEFAULT_SUBJECT.into()),
            port: parse_param(params, "port", DEFAULT_PORT)?,
            username: string_param(params, "username"),
            password: string_param(params, "password"),
        })
    }
}

/// Sink that mails each report to a fixed recipient
pub struct MailSink {
    name: String,
    config: MailSinkConfig,
}

impl MailSink {
    pub fn new(name: impl Into<String>, config: MailSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        Ok(Self::new(name, MailSinkConfig::from_params(params)?))
    }

    fn require<'a>(&self, value: &'a Option<String>, field: &str) -> Result<&'a str, ContractError> {
        value
            .as_deref()
            .ok_or_else(|| ContractError::sink_configuration(&self.name, field))
    }

    fn mailbox(&self, field: &str, raw: &str) -> Result<Mailbox, ContractError> {
        raw.trim().parse().map_err(|e| {
            ContractError::config_validation(
                format!("{}.{field}", self.name),
                format!("invalid address '{raw}': {e}"),
            )
        })
    }

    /// Build the message without sending it.
    ///
    /// Fails with a configuration error naming the first unset field among
    /// `from`, `to`, `server`.
    pub fn build_message(&self, report: &Report) -> Result<Message, ContractError> {
        let from = self.require(&self.config.from, "from")?;
        let to = self.require(&self.config.to, "to")?;
        self.require(&self.config.server, "server")?;

        let mut builder = Message::builder()
            .from(self.mailbox("from", from)?)
            .subject(self.config.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        for recipient in to.split([',', ';']).filter(|r| !r.trim().is_empty()) {
            builder = builder.to(self.mailbox("to", recipient)?);
        }

        builder
            .body(report.as_str().to_string())
            .map_err(|e| ContractError::sink_delivery(&self.name, e.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport, ContractError> {
        let server = self.require(&self.config.server, "server")?;
        let mut builder = SmtpTransport::builder_dangerous(server)
            .port(self.config.port)
            .timeout(Some(SEND_TIMEOUT));
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(builder.build())
    }
}

impl ReportSink for MailSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "mail_sink_deliver", skip(self, report), fields(sink = %self.name))]
    fn deliver(&self, report: &Report) -> Result<(), ContractError> {
        let message = self.build_message(report)?;
        let response = self
            .transport()?
            .send(&message)
            .map_err(|e| ContractError::sink_delivery(&self.name, e.to_string()))?;

        debug!(
            sink = %self.name,
            server = ?self.config.server,
            code = %response.code(),
            "Report mailed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> MailSinkConfig {
        MailSinkConfig {
            from: Some("viewer@example.com".into()),
            to: Some("bugs@example.com".into()),
            server: Some("smtp.example.com".into()),
            ..MailSinkConfig::default()
        }
    }

    fn missing_field(config: MailSinkConfig) -> String {
        let sink = MailSink::new("mail", config);
        match sink.deliver(&Report::new("r")).unwrap_err() {
            ContractError::SinkConfiguration { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unset_fields_reported_in_order() {
        assert_eq!(missing_field(MailSinkConfig::default()), "from");
        assert_eq!(
            missing_field(MailSinkConfig {
                to: None,
                ..configured()
            }),
            "to"
        );
        assert_eq!(
            missing_field(MailSinkConfig {
                server: None,
                ..configured()
            }),
            "server"
        );
    }

    #[test]
    fn test_message_carries_report_and_default_subject() {
        let sink = MailSink::new("mail", configured());
        let message = sink
            .build_message(&Report::new("Exception classes:\n   Failure\n"))
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Unhandled exception report"));
        assert!(raw.contains("To: bugs@example.com"));
        assert!(raw.contains("Exception classes:"));
        assert!(raw.contains("   Failure"));
    }

    #[test]
    fn test_multiple_recipients() {
        let sink = MailSink::new(
            "mail",
            MailSinkConfig {
                to: Some("a@example.com; b@example.com".into()),
                ..configured()
            },
        );
        let message = sink.build_message(&Report::new("r")).unwrap();
        assert_eq!(message.envelope().to().len(), 2);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let sink = MailSink::new(
            "mail",
            MailSinkConfig {
                from: Some("not an address".into()),
                ..configured()
            },
        );
        let err = sink.build_message(&Report::new("r")).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_params() {
        let mut params = HashMap::new();
        params.insert("subject".to_string(), "Crash".to_string());
        params.insert("port".to_string(), "2525".to_string());
        let config = MailSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.subject, "Crash");
        assert_eq!(config.port, 2525);
        assert!(config.server.is_none());

        assert_eq!(
            MailSinkConfig::from_params(&HashMap::new()).unwrap().port,
            25
        );
    }
}
