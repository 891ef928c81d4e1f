//! Configuration management module
//!
//! This module resolves the service settings at startup from the process
//! environment, `.env` files and the secret store.

pub mod env;
pub mod keys;
pub mod resolver;
pub mod settings;

pub use env::EnvSnapshot;
pub use keys::{RequiredKeySet, BASE_REQUIRED_KEYS, DEPLOYED_REQUIRED_KEYS};
pub use resolver::{decode_secret_key, ConfigResolver, APP_CHANNEL_KEY};
pub use settings::{
    AuthSettings, CacheSettings, Channel, DatabaseSettings, PulseSettings, Settings, StatuspageSettings,
    PROJECT_ID,
};
