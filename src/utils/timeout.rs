//! Timeouts for outbound secret service calls

use std::time::Duration;

use crate::config::EnvSnapshot;

/// Timeouts applied by the secret store client
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Upper bound for one secret fetch attempt (default: 30s)
    pub secrets_timeout: Duration,

    /// TCP connect timeout for the HTTP client (default: 10s)
    pub connect_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            secrets_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secrets_timeout(mut self, timeout: Duration) -> Self {
        self.secrets_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Read `TASKCLUSTER_TIMEOUT_SECS`; unparsable values keep the default
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let mut config = Self::default();

        if let Some(val) = env.get("TASKCLUSTER_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.secrets_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Ignoring invalid TASKCLUSTER_TIMEOUT_SECS"),
            }
        }

        config
    }
}

/// Apply a timeout to an async operation
pub async fn with_timeout<T, E>(
    timeout: Duration,
    future: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, TimeoutError<E>> {
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TimeoutError::Inner(err)),
        Err(_) => Err(TimeoutError::Timeout(timeout)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E> {
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Inner(E),
}
