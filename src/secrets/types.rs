//! Secret store trait and the values it exchanges with the resolver

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{env::parse_bool, EnvSnapshot};
use crate::error::{ConfigurationError, SecretStoreError};

/// Name of the layer shared by every project in a secret payload
pub const COMMON_LAYER: &str = "common";

/// Taskcluster client credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub access_token: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Read `TASKCLUSTER_CLIENT_ID` / `TASKCLUSTER_ACCESS_TOKEN`
    ///
    /// Both must be set; a lone client id or token is ignored with a warning.
    pub fn from_env(env: &EnvSnapshot) -> Option<Self> {
        match (
            env.get_non_empty("TASKCLUSTER_CLIENT_ID"),
            env.get_non_empty("TASKCLUSTER_ACCESS_TOKEN"),
        ) {
            (Some(id), Some(token)) => Some(Self::new(id, token)),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "Only one of TASKCLUSTER_CLIENT_ID and TASKCLUSTER_ACCESS_TOKEN is set; ignoring credentials"
                );
                None
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// One fetch from a secret store
#[derive(Debug, Clone)]
pub struct SecretRequest {
    /// Secret to read; `None` means only `existing` is used
    pub secret_name: Option<String>,
    /// Layer inside the secret holding this project's values
    pub project_id: String,
    pub required: Vec<String>,
    /// Values already known from the environment; never overridden
    pub existing: BTreeMap<String, String>,
    pub credentials: Option<Credentials>,
}

impl SecretRequest {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            secret_name: None,
            project_id: project_id.into(),
            required: Vec::new(),
            existing: BTreeMap::new(),
            credentials: None,
        }
    }

    pub fn with_secret_name(mut self, name: impl Into<String>) -> Self {
        self.secret_name = Some(name.into());
        self
    }

    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = required;
        self
    }

    pub fn with_existing(mut self, existing: BTreeMap<String, String>) -> Self {
        self.existing = existing;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Merged secret values keyed by name
///
/// Values stay JSON because the secret store may hold non-string data
/// (booleans, numbers, the status page component mapping). Typed accessors
/// coerce on read and report failures as [`ConfigurationError`].
#[derive(Clone, Default, PartialEq)]
pub struct ResolvedSecrets {
    values: BTreeMap<String, Value>,
}

impl ResolvedSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scalar value rendered as a string; `None` when absent or structured
    pub fn get_scalar(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, ConfigurationError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Err(ConfigurationError::MissingKey(key.to_string())),
            Some(_) => self
                .get_scalar(key)
                .ok_or_else(|| ConfigurationError::invalid(key, "expected a string value")),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigurationError> {
        match self.values.get(key) {
            None | Some(Value::Null) => Err(ConfigurationError::MissingKey(key.to_string())),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
            Some(Value::String(s)) => parse_bool(s)
                .ok_or_else(|| ConfigurationError::invalid(key, format!("{s:?} is not a boolean"))),
            Some(_) => Err(ConfigurationError::invalid(key, "expected a boolean")),
        }
    }

    /// Parse a scalar value as `T` (integers, floats)
    pub fn get_parsed<T>(&self, key: &str) -> Result<T, ConfigurationError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.get_str(key)?;
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigurationError::invalid(key, format!("{raw:?}: {e}")))
    }
}

impl fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ResolvedSecrets {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Client for a remote secret store
///
/// Implementations fetch the named secret, fold `existing` over it and make
/// sure every required key is present. Retries and timeouts, if any, are the
/// implementation's business.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn fetch(&self, request: &SecretRequest) -> Result<ResolvedSecrets, SecretStoreError>;
}

/// Merge a secret payload with the request's known values
///
/// The payload's `common` layer is applied first, then the project layer.
/// `existing` values are applied last so the environment always wins.
pub fn merge_secret_payload(
    request: &SecretRequest,
    payload: Option<&Value>,
) -> Result<ResolvedSecrets, SecretStoreError> {
    let mut secrets = ResolvedSecrets::new();

    if let Some(payload) = payload {
        let layers = payload
            .as_object()
            .ok_or_else(|| SecretStoreError::Payload("secret is not a JSON object".to_string()))?;

        for layer in [COMMON_LAYER, request.project_id.as_str()] {
            match layers.get(layer) {
                None | Some(Value::Null) => {}
                Some(Value::Object(values)) => {
                    for (key, value) in values {
                        secrets.insert(key.clone(), value.clone());
                    }
                }
                Some(_) => {
                    return Err(SecretStoreError::Payload(format!(
                        "layer {layer:?} is not a JSON object"
                    )))
                }
            }
        }
    }

    for (key, value) in &request.existing {
        secrets.insert(key.clone(), value.clone());
    }

    if let Some(missing) = request.required.iter().find(|key| !secrets.contains(key)) {
        return Err(SecretStoreError::MissingRequired(missing.clone()));
    }

    Ok(secrets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> SecretRequest {
        SecretRequest::new("treestatus/api").with_secret_name("project/treestatus/production")
    }

    #[test]
    fn test_project_layer_overrides_common() {
        let payload = json!({
            "common": {"AUTH_DOMAIN": "auth.example.com", "APP_CHANNEL": "staging"},
            "treestatus/api": {"APP_CHANNEL": "production"},
            "other/project": {"APP_CHANNEL": "testing"},
        });

        let secrets = merge_secret_payload(&request(), Some(&payload)).unwrap();
        assert_eq!(secrets.get_str("APP_CHANNEL").unwrap(), "production");
        assert_eq!(secrets.get_str("AUTH_DOMAIN").unwrap(), "auth.example.com");
        assert_eq!(secrets.len(), 2);
    }

    #[test]
    fn test_existing_values_win() {
        let payload = json!({"common": {"DATABASE_URL": "postgresql://store/db"}});
        let request = request()
            .with_required(vec!["DATABASE_URL".to_string()])
            .with_existing(BTreeMap::from([(
                "DATABASE_URL".to_string(),
                "postgresql://env/db".to_string(),
            )]));

        let secrets = merge_secret_payload(&request, Some(&payload)).unwrap();
        assert_eq!(secrets.get_str("DATABASE_URL").unwrap(), "postgresql://env/db");
    }

    #[test]
    fn test_missing_required_key() {
        let request = request().with_required(vec!["REDIS_URL".to_string()]);
        let err = merge_secret_payload(&request, Some(&json!({"common": {}}))).unwrap_err();
        assert!(matches!(err, SecretStoreError::MissingRequired(ref k) if k == "REDIS_URL"));
    }

    #[test]
    fn test_malformed_layers_rejected() {
        assert!(matches!(
            merge_secret_payload(&request(), Some(&json!(["not", "an", "object"]))),
            Err(SecretStoreError::Payload(_))
        ));
        assert!(matches!(
            merge_secret_payload(&request(), Some(&json!({"common": "oops"}))),
            Err(SecretStoreError::Payload(_))
        ));
    }

    #[test]
    fn test_typed_accessors() {
        let secrets: ResolvedSecrets = [
            ("PULSE_PORT", json!(5671)),
            ("PULSE_CONNECTION_TIMEOUT", json!("5")),
            ("PULSE_USE_SSL", json!("true")),
            ("FLAG", json!(false)),
            ("BAD_PORT", json!("five")),
            ("COMPONENTS", json!({"autoland": "abc"})),
        ]
        .into_iter()
        .collect();

        assert_eq!(secrets.get_parsed::<u16>("PULSE_PORT").unwrap(), 5671);
        assert_eq!(secrets.get_parsed::<u64>("PULSE_CONNECTION_TIMEOUT").unwrap(), 5);
        assert!(secrets.get_bool("PULSE_USE_SSL").unwrap());
        assert!(!secrets.get_bool("FLAG").unwrap());
        assert_eq!(secrets.get_str("PULSE_PORT").unwrap(), "5671");

        assert!(matches!(
            secrets.get_parsed::<u16>("BAD_PORT"),
            Err(ConfigurationError::InvalidValue { ref key, .. }) if key == "BAD_PORT"
        ));
        assert!(matches!(secrets.get_str("COMPONENTS"), Err(ConfigurationError::InvalidValue { .. })));
        assert!(matches!(secrets.get_str("NOPE"), Err(ConfigurationError::MissingKey(_))));
    }

    #[test]
    fn test_debug_output_hides_values() {
        let secrets: ResolvedSecrets = [("AUTH_CLIENT_SECRET", json!("s3cr3t"))].into_iter().collect();
        let debug = format!("{secrets:?}");
        assert!(debug.contains("AUTH_CLIENT_SECRET"));
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn test_credentials_from_env() {
        let env = EnvSnapshot::from_pairs([
            ("TASKCLUSTER_CLIENT_ID", "project/treestatus"),
            ("TASKCLUSTER_ACCESS_TOKEN", "token"),
        ]);
        let creds = Credentials::from_env(&env).unwrap();
        assert_eq!(creds.client_id, "project/treestatus");
        assert!(!format!("{creds:?}").contains("\"token\""));

        let env = EnvSnapshot::from_pairs([("TASKCLUSTER_CLIENT_ID", "project/treestatus")]);
        assert!(Credentials::from_env(&env).is_none());
    }
}
