//! Taskcluster secrets service client
//!
//! Reads `GET {root}/api/secrets/v1/secret/{name}`. With credentials the
//! request is Hawk-signed and sent to `TASKCLUSTER_ROOT_URL`; without them
//! it goes through the in-task proxy at `http://taskcluster`, which signs on
//! our behalf.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use super::hawk;
use super::types::{merge_secret_payload, Credentials, ResolvedSecrets, SecretRequest, SecretStore};
use crate::config::EnvSnapshot;
use crate::error::SecretStoreError;
use crate::utils::retry::{presets, retry_with_backoff, RetryConfig};
use crate::utils::timeout::{with_timeout, TimeoutConfig, TimeoutError};

/// Root URL of the in-task Taskcluster proxy
pub const TASKCLUSTER_PROXY_URL: &str = "http://taskcluster";

/// Connection settings for [`TaskclusterSecretStore`]
#[derive(Debug, Clone)]
pub struct TaskclusterConfig {
    /// Deployment root URL; required when credentials are supplied
    pub root_url: Option<String>,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
}

impl Default for TaskclusterConfig {
    fn default() -> Self {
        Self {
            root_url: None,
            timeouts: TimeoutConfig::default(),
            retry: presets::secrets(),
        }
    }
}

impl TaskclusterConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            root_url: env.get_non_empty("TASKCLUSTER_ROOT_URL").map(str::to_string),
            timeouts: TimeoutConfig::from_env(env),
            retry: presets::secrets(),
        }
    }

    pub fn with_root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = Some(root_url.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Deserialize)]
struct SecretResponse {
    secret: Value,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
}

/// Secret store backed by the Taskcluster secrets service
#[derive(Debug, Clone)]
pub struct TaskclusterSecretStore {
    client: Client,
    config: TaskclusterConfig,
}

impl TaskclusterSecretStore {
    pub fn new(config: TaskclusterConfig) -> Result<Self, SecretStoreError> {
        let client = Client::builder()
            .connect_timeout(config.timeouts.connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// URL of a secret, choosing the root from the credentials in use
    pub fn secret_url(&self, name: &str, credentials: Option<&Credentials>) -> Result<Url, SecretStoreError> {
        let root = match (&self.config.root_url, credentials) {
            (Some(root), _) => root.as_str(),
            (None, None) => TASKCLUSTER_PROXY_URL,
            (None, Some(_)) => {
                return Err(SecretStoreError::InvalidConfig(
                    "TASKCLUSTER_ROOT_URL must be set when using Taskcluster credentials".to_string(),
                ))
            }
        };

        let mut url = Url::parse(root)
            .map_err(|e| SecretStoreError::InvalidConfig(format!("invalid root URL {root:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SecretStoreError::InvalidConfig(format!("root URL {root:?} cannot be a base")))?
            .pop_if_empty()
            .extend(["api", "secrets", "v1", "secret", name]);

        Ok(url)
    }

    async fn get_secret(
        &self,
        name: &str,
        url: &Url,
        credentials: Option<&Credentials>,
    ) -> Result<SecretResponse, SecretStoreError> {
        let mut request = self.client.get(url.clone());
        if let Some(creds) = credentials {
            request = request.header(header::AUTHORIZATION, hawk::authorization_header(creds, "GET", url)?);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<SecretResponse>()
                .await
                .map_err(|e| SecretStoreError::Payload(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => SecretStoreError::NotFound(name.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SecretStoreError::Unauthorized {
                name: name.to_string(),
                message: body,
            },
            _ => SecretStoreError::Http {
                status: status.as_u16(),
                body,
            },
        })
    }
}

#[async_trait]
impl SecretStore for TaskclusterSecretStore {
    fn name(&self) -> &str {
        "taskcluster"
    }

    async fn fetch(&self, request: &SecretRequest) -> Result<ResolvedSecrets, SecretStoreError> {
        let Some(ref name) = request.secret_name else {
            tracing::debug!("No secret name configured, using environment values only");
            return merge_secret_payload(request, None);
        };

        let credentials = request.credentials.as_ref();
        let url = self.secret_url(name, credentials)?;
        let timeout = self.config.timeouts.secrets_timeout;

        tracing::debug!(
            secret = %name,
            url = %url,
            authenticated = credentials.is_some(),
            "Fetching secret from Taskcluster"
        );

        let url_ref = &url;
        let outcome = retry_with_backoff(&self.config.retry, SecretStoreError::is_transient, move || async move {
            with_timeout(timeout, self.get_secret(name, url_ref, credentials))
                .await
                .map_err(|err| match err {
                    TimeoutError::Timeout(elapsed) => SecretStoreError::Timeout(elapsed),
                    TimeoutError::Inner(inner) => inner,
                })
        })
        .await;

        let attempts = outcome.attempts;
        let response = outcome.into_result()?;

        tracing::info!(
            secret = %name,
            attempts,
            expires = ?response.expires,
            "Fetched secret from Taskcluster"
        );

        merge_secret_payload(request, Some(&response.secret))
    }
}
