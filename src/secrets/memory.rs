//! In-memory secret store

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::{merge_secret_payload, ResolvedSecrets, SecretRequest, SecretStore};
use crate::error::SecretStoreError;

/// Secret store holding payloads in memory
///
/// Payloads have the same shape as Taskcluster secrets: a `common` layer
/// plus one layer per project. Useful for tests and offline runs.
///
/// ```
/// use treestatus_settings::secrets::MemorySecretStore;
/// use serde_json::json;
///
/// let store = MemorySecretStore::new().with_secret(
///     "project/treestatus/local",
///     json!({"common": {"APP_CHANNEL": "local"}}),
/// );
/// assert_eq!(store.fetch_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, Value>,
    fetches: AtomicUsize,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, payload: Value) -> Self {
        self.secrets.insert(name.into(), payload);
        self
    }

    /// Number of `fetch` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, request: &SecretRequest) -> Result<ResolvedSecrets, SecretStoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let payload = match request.secret_name {
            Some(ref name) => Some(
                self.secrets
                    .get(name)
                    .ok_or_else(|| SecretStoreError::NotFound(name.clone()))?,
            ),
            None => None,
        };

        merge_secret_payload(request, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_fetch_named_secret() {
        let store = MemorySecretStore::new().with_secret(
            "project/treestatus/testing",
            json!({"common": {"APP_CHANNEL": "testing"}}),
        );
        let request = SecretRequest::new("treestatus/api").with_secret_name("project/treestatus/testing");

        let secrets = store.fetch(&request).await.unwrap();
        assert_eq!(secrets.get_str("APP_CHANNEL").unwrap(), "testing");
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_secret() {
        let store = MemorySecretStore::new();
        let request = SecretRequest::new("treestatus/api").with_secret_name("missing");

        assert!(matches!(store.fetch(&request).await, Err(SecretStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_without_secret_name_uses_existing_only() {
        let store = MemorySecretStore::new();
        let request = SecretRequest::new("treestatus/api")
            .with_required(vec!["DATABASE_URL".to_string()])
            .with_existing(BTreeMap::from([(
                "DATABASE_URL".to_string(),
                "sqlite:///tmp/treestatus.db".to_string(),
            )]));

        let secrets = store.fetch(&request).await.unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets.get_str("DATABASE_URL").unwrap(), "sqlite:///tmp/treestatus.db");
    }
}
