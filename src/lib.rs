//! Tree status service startup configuration
//!
//! Resolves deployment secrets from the Taskcluster secrets service or the
//! environment and derives the typed settings the service starts with.
//!
//! ```no_run
//! use std::sync::Arc;
//! use treestatus_settings::{ConfigResolver, EnvSnapshot};
//! use treestatus_settings::secrets::{TaskclusterConfig, TaskclusterSecretStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let env = EnvSnapshot::from_process();
//! let store = TaskclusterSecretStore::new(TaskclusterConfig::from_env(&env))?;
//! let settings = ConfigResolver::new(Arc::new(store)).resolve(&env).await?;
//! println!("starting on channel {}", settings.channel);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod secrets;
pub mod utils;

pub use config::{Channel, ConfigResolver, EnvSnapshot, RequiredKeySet, Settings};
pub use error::{ConfigurationError, SecretStoreError};
pub use secrets::{MemorySecretStore, SecretStore, TaskclusterSecretStore};
