//! Layered error definitions
//!
//! Categorized by source: config / sink configuration / sink delivery

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink used before one of its required fields was set
    #[error("sink '{sink_name}' is not configured: {field} has not been set")]
    SinkConfiguration { sink_name: String, field: String },

    /// Sink transport failed
    #[error("sink '{sink_name}' delivery error: {message}")]
    SinkDelivery { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink configuration error
    pub fn sink_configuration(sink_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::SinkConfiguration {
            sink_name: sink_name.into(),
            field: field.into(),
        }
    }

    /// Create sink delivery error
    pub fn sink_delivery(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkDelivery {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by a sink missing required configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::SinkConfiguration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_configuration_message_names_field() {
        let err = ContractError::sink_configuration("mail", "from");
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "sink 'mail' is not configured: from has not been set"
        );
    }

    #[test]
    fn test_delivery_error_is_not_configuration() {
        let err = ContractError::sink_delivery("http", "connection refused");
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("connection refused"));
    }
}
