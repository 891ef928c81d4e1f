//! Startup configuration resolution
//!
//! Gathers the required keys from the environment and the secret store,
//! then derives the typed [`Settings`] the service starts with.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::env::EnvSnapshot;
use super::keys::RequiredKeySet;
use super::settings::{
    AuthSettings, CacheSettings, Channel, DatabaseSettings, PulseSettings, Settings, StatuspageSettings,
    DEFAULT_CACHE_TIMEOUT_SECS, PROJECT_ID,
};
use crate::error::ConfigurationError;
use crate::secrets::{Credentials, ResolvedSecrets, SecretRequest, SecretStore};

/// Key naming the deployment channel
pub const APP_CHANNEL_KEY: &str = "APP_CHANNEL";

const CACHE_PREFIX: &str = "CACHE_";

/// Builds [`Settings`] from an environment snapshot and a secret store
pub struct ConfigResolver {
    store: Arc<dyn SecretStore>,
    project_id: String,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            project_id: PROJECT_ID.to_string(),
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Resolve settings, reading debug mode, the secret name and the
    /// Taskcluster credentials from `env`.
    pub async fn resolve(&self, env: &EnvSnapshot) -> Result<Settings, ConfigurationError> {
        let secret_name = env.get_non_empty("TASKCLUSTER_SECRET").map(str::to_string);
        self.resolve_with(env.debug_mode(), env, secret_name, Credentials::from_env(env))
            .await
    }

    /// Resolve settings with debug mode, secret name and credentials given
    /// explicitly.
    pub async fn resolve_with(
        &self,
        debug_mode: bool,
        env: &EnvSnapshot,
        secret_name: Option<String>,
        credentials: Option<Credentials>,
    ) -> Result<Settings, ConfigurationError> {
        let required = RequiredKeySet::for_mode(debug_mode);
        let existing = existing_values(&required, env);

        tracing::info!(
            debug = debug_mode,
            project_id = %self.project_id,
            secret = secret_name.as_deref().unwrap_or("<none>"),
            store = self.store.name(),
            required = required.len(),
            from_env = existing.len(),
            "Resolving configuration"
        );

        let mut request = SecretRequest::new(&self.project_id)
            .with_required(required.clone().into())
            .with_existing(existing)
            .with_credentials(credentials);
        request.secret_name = secret_name;

        let secrets = self.store.fetch(&request).await?;

        if let Some(missing) = required.iter().find(|key| !secrets.contains(key)) {
            return Err(ConfigurationError::MissingKey(missing.to_string()));
        }

        let settings = self.derive(debug_mode, env, secrets)?;

        tracing::info!(
            channel = %settings.channel,
            pulse_enabled = settings.pulse_enabled(),
            statuspage_enabled = settings.statuspage.enable,
            "Configuration resolved"
        );

        Ok(settings)
    }

    fn derive(
        &self,
        debug: bool,
        env: &EnvSnapshot,
        secrets: ResolvedSecrets,
    ) -> Result<Settings, ConfigurationError> {
        let secret_key = decode_secret_key(&secrets.get_str("SECRET_KEY_BASE64")?)?;
        let channel: Channel = secrets.get_str(APP_CHANNEL_KEY)?.parse()?;

        Ok(Settings {
            debug,
            channel,
            project_id: self.project_id.clone(),
            secret_key,
            database: database_settings(debug, channel, env, &secrets)?,
            cache: cache_settings(channel, env, &secrets, &self.project_id)?,
            auth: auth_settings(&secrets)?,
            pulse: if debug { None } else { Some(pulse_settings(&secrets)?) },
            statuspage: statuspage_settings(&secrets),
            secrets,
        })
    }
}

/// Required keys already present in the environment
fn existing_values(required: &RequiredKeySet, env: &EnvSnapshot) -> BTreeMap<String, String> {
    required
        .iter()
        .filter_map(|key| env.get(key).map(|value| (key.to_string(), value.to_string())))
        .collect()
}

pub fn decode_secret_key(encoded: &str) -> Result<Vec<u8>, ConfigurationError> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| ConfigurationError::invalid("SECRET_KEY_BASE64", e.to_string()))
}

/// Value for `key`, preferring the environment on deployed channels
///
/// The environment value has normally been folded into the secrets already;
/// checking it again keeps the precedence explicit.
fn deployed_value(
    key: &str,
    channel: Channel,
    env: &EnvSnapshot,
    secrets: &ResolvedSecrets,
) -> Result<String, ConfigurationError> {
    match env.get(key) {
        Some(value) if channel.is_deployed() => Ok(value.to_string()),
        _ => secrets.get_str(key),
    }
}

fn database_settings(
    debug: bool,
    channel: Channel,
    env: &EnvSnapshot,
    secrets: &ResolvedSecrets,
) -> Result<DatabaseSettings, ConfigurationError> {
    Ok(DatabaseSettings {
        uri: deployed_value("DATABASE_URL", channel, env, secrets)?,
        track_modifications: false,
        echo: debug.then_some(true),
    })
}

fn cache_settings(
    channel: Channel,
    env: &EnvSnapshot,
    secrets: &ResolvedSecrets,
    project_id: &str,
) -> Result<CacheSettings, ConfigurationError> {
    let mut extra: BTreeMap<String, String> = env
        .with_prefix(CACHE_PREFIX)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let default_timeout = match extra.remove(CacheSettings::DEFAULT_TIMEOUT_KEY) {
        None => DEFAULT_CACHE_TIMEOUT_SECS,
        Some(raw) => raw.trim().parse::<f64>().map_err(|e| {
            ConfigurationError::invalid(CacheSettings::DEFAULT_TIMEOUT_KEY, format!("{raw:?}: {e}"))
        })?,
    };

    let key_prefix = extra
        .remove(CacheSettings::KEY_PREFIX_KEY)
        .unwrap_or_else(|| format!("{project_id}-"));

    let mut cache_type = extra.remove(CacheSettings::TYPE_KEY);
    let mut redis_url = extra.remove(CacheSettings::REDIS_URL_KEY);

    if channel.is_deployed() {
        cache_type = Some("redis".to_string());
        redis_url = Some(deployed_value("REDIS_URL", channel, env, secrets)?);
    }

    Ok(CacheSettings {
        default_timeout,
        key_prefix,
        cache_type,
        redis_url,
        extra,
    })
}

fn auth_settings(secrets: &ResolvedSecrets) -> Result<AuthSettings, ConfigurationError> {
    Ok(AuthSettings {
        domain: secrets.get_str("AUTH_DOMAIN")?,
        client_id: secrets.get_str("AUTH_CLIENT_ID")?,
        client_secret: secrets.get_str("AUTH_CLIENT_SECRET")?,
        redirect_uri: secrets.get_str("AUTH_REDIRECT_URI")?,
    })
}

fn pulse_settings(secrets: &ResolvedSecrets) -> Result<PulseSettings, ConfigurationError> {
    Ok(PulseSettings {
        // TODO: switch on once the tree status exchange is provisioned in pulse
        enable: false,
        exchange: secrets.get_str("PULSE_TREESTATUS_EXCHANGE")?,
        use_ssl: secrets.get_bool("PULSE_USE_SSL")?,
        connection_timeout: secrets.get_parsed("PULSE_CONNECTION_TIMEOUT")?,
        host: secrets.get_str("PULSE_HOST")?,
        port: secrets.get_parsed("PULSE_PORT")?,
        user: secrets.get_str("PULSE_USER")?,
        password: secrets.get_str("PULSE_PASSWORD")?,
        virtual_host: secrets.get_str("PULSE_VIRTUAL_HOST")?,
    })
}

/// Status page values are passed through without validation; anything
/// missing or of the wrong shape is left empty.
fn statuspage_settings(secrets: &ResolvedSecrets) -> StatuspageSettings {
    let components = match secrets.get("STATUSPAGE_COMPONENTS") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(tree, id)| match id {
                Value::String(s) => Some((tree.clone(), s.clone())),
                Value::Number(n) => Some((tree.clone(), n.to_string())),
                _ => {
                    tracing::warn!(tree = %tree, "STATUSPAGE_COMPONENTS entry is not a string, ignoring");
                    None
                }
            })
            .collect(),
        Some(_) => {
            tracing::warn!("STATUSPAGE_COMPONENTS is not a mapping, ignoring");
            BTreeMap::new()
        }
    };

    let tags = match secrets.get("STATUSPAGE_TAGS") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|tag| tag.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        Some(_) => {
            tracing::warn!("STATUSPAGE_TAGS is not a list, ignoring");
            Vec::new()
        }
    };

    StatuspageSettings {
        token: secrets.get_scalar("STATUSPAGE_TOKEN"),
        page_id: secrets.get_scalar("STATUSPAGE_PAGE_ID"),
        components,
        notify_on_error: secrets.get_scalar("STATUSPAGE_NOTIFY_ON_ERROR"),
        tags,
        ..StatuspageSettings::default()
    }
}
