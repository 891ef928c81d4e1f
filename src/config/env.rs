//! Snapshot of the process environment
//!
//! Settings are derived from an owned copy of the environment rather than
//! from `std::env` directly, so tests can build independent configurations
//! side by side without touching global process state.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigurationError;

/// Variable holding the local-development flag
pub const DEBUG_VAR: &str = "DEBUG";

/// Ordered key/value copy of an environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Layer a `.env` file underneath this snapshot
    ///
    /// Entries already present win over the file, matching `dotenvy`'s
    /// behaviour of never overriding variables set by the shell.
    pub fn with_dotenv(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let entries = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigurationError::invalid(path.display().to_string(), e.to_string()))?;

        let mut loaded = 0usize;
        for entry in entries {
            let (key, value) = entry
                .map_err(|e| ConfigurationError::invalid(path.display().to_string(), e.to_string()))?;
            if !self.vars.contains_key(&key) {
                self.vars.insert(key, value);
                loaded += 1;
            }
        }

        tracing::debug!(path = %path.display(), loaded, "Loaded variables from env file");
        Ok(self)
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get) but treats empty values as unset
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All variables whose name starts with `prefix`, names left unstripped
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter().filter(move |(key, _)| key.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Whether the service runs in local-development mode
    pub fn debug_mode(&self) -> bool {
        parse_debug_flag(self.get(DEBUG_VAR))
    }
}

/// Interpret the `DEBUG` variable
///
/// Absent or empty means off; any other value, `0` and `false` included,
/// turns debug on.
pub fn parse_debug_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Parse the usual spellings of a boolean
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
