//! Configuration validation
//!
//! Rules:
//! - sink names are non-empty and unique
//! - mail/http sinks carry all required params
//! - the http query template holds exactly one report slot
//! - worker_threads > 0

use std::collections::HashSet;

use contracts::{ContractError, ReporterConfig, SinkType, REPORT_SLOT};

/// Validate a ReporterConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ReporterConfig) -> Result<(), ContractError> {
    validate_worker_threads(config)?;
    validate_sink_names(config)?;
    validate_sink_params(config)?;
    validate_http_templates(config)?;
    Ok(())
}

fn validate_worker_threads(config: &ReporterConfig) -> Result<(), ContractError> {
    if config.worker_threads == 0 {
        return Err(ContractError::config_validation(
            "worker_threads",
            "worker_threads must be > 0",
        ));
    }
    Ok(())
}

/// Sink names must be non-empty and unique
fn validate_sink_names(config: &ReporterConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_sink_params(config: &ReporterConfig) -> Result<(), ContractError> {
    for sink in &config.sinks {
        if let Some(field) = sink.missing_params().first() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.{}", sink.name, field),
                format!("required by {:?} sink", sink.sink_type),
            ));
        }
    }
    Ok(())
}

fn validate_http_templates(config: &ReporterConfig) -> Result<(), ContractError> {
    for sink in config
        .sinks
        .iter()
        .filter(|s| s.sink_type == SinkType::Http)
    {
        let slots = sink
            .param("query")
            .map(|q| q.matches(REPORT_SLOT).count())
            .unwrap_or(0);
        if slots != 1 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.query", sink.name),
                format!("query must contain {REPORT_SLOT} exactly once, found {slots}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkConfig;

    fn config_with(sinks: Vec<SinkConfig>) -> ReporterConfig {
        ReporterConfig {
            sinks,
            ..ReporterConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = config_with(vec![
            SinkConfig::new("file", SinkType::File),
            SinkConfig::new("web", SinkType::Http)
                .with_param("url", "http://localhost/bugs")
                .with_param("query", "error={report}"),
        ]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_sink_name() {
        let config = config_with(vec![
            SinkConfig::new("out", SinkType::File),
            SinkConfig::new("out", SinkType::EventLog),
        ]);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_sink_name() {
        let config = config_with(vec![SinkConfig::new("", SinkType::File)]);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_mail_missing_server() {
        let config = config_with(vec![SinkConfig::new("mail", SinkType::Mail)
            .with_param("from", "a@example.com")
            .with_param("to", "b@example.com")]);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("params.server"));
    }

    #[test]
    fn test_http_query_needs_single_slot() {
        let config = config_with(vec![SinkConfig::new("web", SinkType::Http)
            .with_param("url", "http://localhost/bugs")
            .with_param("query", "a={report}&b={report}")]);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_zero_worker_threads() {
        let config = ReporterConfig {
            worker_threads: 0,
            ..ReporterConfig::default()
        };
        assert!(validate(&config).is_err());
    }
}
