//! Secret store clients
//!
//! - `SecretStore` trait, implemented by each backend
//! - `TaskclusterSecretStore`: the Taskcluster secrets service (production)
//! - `MemorySecretStore`: in-memory payloads for tests and offline runs

mod hawk;
mod memory;
mod taskcluster;
mod types;

pub use hawk::{authorization_header, HawkArtifacts};
pub use memory::MemorySecretStore;
pub use taskcluster::{TaskclusterConfig, TaskclusterSecretStore, TASKCLUSTER_PROXY_URL};
pub use types::{
    merge_secret_payload, Credentials, ResolvedSecrets, SecretRequest, SecretStore, COMMON_LAYER,
};
