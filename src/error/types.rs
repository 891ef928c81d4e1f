//! Configuration and secret store error types

use std::time::Duration;
use thiserror::Error;

/// Fatal error raised while building the startup settings
///
/// Every variant names the offending key so the process can abort with a
/// message an operator can act on.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required configuration value: {0}")]
    MissingKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Secret store error: {0}")]
    SecretStore(#[from] SecretStoreError),
}

impl ConfigurationError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// The configuration key this error refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::MissingKey(key) => Some(key.as_str()),
            Self::InvalidValue { key, .. } => Some(key.as_str()),
            Self::SecretStore(SecretStoreError::MissingRequired(key)) => Some(key.as_str()),
            Self::SecretStore(_) => None,
        }
    }
}

/// Errors returned by secret store clients
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Not authorized to read secret {name}: {message}")]
    Unauthorized { name: String, message: String },

    #[error("Secret service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Secret request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed secret payload: {0}")]
    Payload(String),

    #[error("Missing value {0} in secrets")]
    MissingRequired(String),

    #[error("Invalid secret store configuration: {0}")]
    InvalidConfig(String),
}

impl SecretStoreError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Request(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_key() {
        let err = ConfigurationError::MissingKey("DATABASE_URL".to_string());
        assert!(err.to_string().contains("DATABASE_URL"));
        assert_eq!(err.key(), Some("DATABASE_URL"));

        let err = ConfigurationError::invalid("PULSE_PORT", "not an integer");
        assert_eq!(err.to_string(), "Invalid value for PULSE_PORT: not an integer");
        assert_eq!(err.key(), Some("PULSE_PORT"));
    }

    #[test]
    fn test_missing_required_from_store_exposes_key() {
        let err: ConfigurationError = SecretStoreError::MissingRequired("REDIS_URL".to_string()).into();
        assert_eq!(err.key(), Some("REDIS_URL"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(SecretStoreError::Http { status: 503, body: String::new() }.is_transient());
        assert!(SecretStoreError::Http { status: 429, body: String::new() }.is_transient());
        assert!(!SecretStoreError::Http { status: 400, body: String::new() }.is_transient());
        assert!(!SecretStoreError::NotFound("x".to_string()).is_transient());
        assert!(SecretStoreError::Timeout(Duration::from_secs(1)).is_transient());
    }
}
