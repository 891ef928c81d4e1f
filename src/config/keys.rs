//! Keys that must resolve before the service may start

use serde::Serialize;

/// Always required
pub const BASE_REQUIRED_KEYS: &[&str] = &[
    "SECRET_KEY_BASE64",
    "DATABASE_URL",
    "AUTH_DOMAIN",
    "AUTH_CLIENT_ID",
    "AUTH_CLIENT_SECRET",
    "AUTH_REDIRECT_URI",
];

/// Required only outside debug mode (cache and pulse connection details)
pub const DEPLOYED_REQUIRED_KEYS: &[&str] = &[
    "REDIS_URL",
    "PULSE_USER",
    "PULSE_TREESTATUS_EXCHANGE",
    "PULSE_USE_SSL",
    "PULSE_CONNECTION_TIMEOUT",
    "PULSE_HOST",
    "PULSE_PORT",
    "PULSE_PASSWORD",
    "PULSE_VIRTUAL_HOST",
];

/// Ordered, duplicate-free list of required keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequiredKeySet {
    keys: Vec<String>,
}

impl RequiredKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base keys, plus the deployed extension unless `debug` is set
    pub fn for_mode(debug: bool) -> Self {
        let mut set = Self::new();
        set.extend(BASE_REQUIRED_KEYS.iter().copied());
        if !debug {
            set.extend(DEPLOYED_REQUIRED_KEYS.iter().copied());
        }
        set
    }

    /// Append a key; returns false if it was already present
    pub fn push(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn extend<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        for key in keys {
            self.push(key);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<RequiredKeySet> for Vec<String> {
    fn from(set: RequiredKeySet) -> Self {
        set.keys
    }
}
