//! Utility modules
//!
//! Retry and timeout helpers used by the secret store clients.

pub mod retry;
pub mod timeout;

pub use retry::{presets, retry_with_backoff, RetryConfig, RetryResult};
pub use timeout::{with_timeout, TimeoutConfig, TimeoutError};
