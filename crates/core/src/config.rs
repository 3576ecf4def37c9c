//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// CAS transfer client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CasConfig {
    /// Instance name inserted into resource names and RPC requests.
    /// Opaque to the client; routes requests to a remote tenant.
    #[serde(default)]
    pub instance_name: String,
    /// Width of the upload/query worker pool. Must be at least 1.
    #[serde(default = "default_cas_concurrency")]
    pub cas_concurrency: usize,
    /// Use batch RPCs for small blobs. When false, every blob is uploaded
    /// individually over the byte stream.
    #[serde(default = "default_use_batch_ops")]
    pub use_batch_ops: bool,
    /// Per-RPC deadline in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Retry behavior for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Exponential backoff retry configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of re-attempts after the first try.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds. Doubles per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling on the backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_cas_concurrency() -> usize {
    16
}

fn default_use_batch_ops() -> bool {
    true
}

fn default_rpc_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    8000
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            instance_name: String::new(),
            cas_concurrency: default_cas_concurrency(),
            use_batch_ops: default_use_batch_ops(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl CasConfig {
    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.cas_concurrency < 1 {
            return Err("cas_concurrency must be at least 1".to_string());
        }
        if self.rpc_timeout_secs == 0 {
            return Err("rpc_timeout_secs must be at least 1".to_string());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(format!(
                "retry.base_delay_ms {} exceeds retry.max_delay_ms {}",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            ));
        }
        Ok(())
    }

    /// Get the per-RPC deadline as a Duration.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Create a test configuration with fast retries.
    ///
    /// **For testing only.** Keeps backoff delays in the millisecond range.
    pub fn for_testing() -> Self {
        Self {
            instance_name: "instance".to_string(),
            cas_concurrency: 4,
            use_batch_ops: true,
            rpc_timeout_secs: 5,
            retry: RetryConfig {
                max_retries: 3,
                base_delay_ms: 1,
                max_delay_ms: 10,
            },
        }
    }
}
