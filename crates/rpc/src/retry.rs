//! Retry engine for transient RPC failures.
//!
//! Retries on transport errors and on remote statuses the service is expected
//! to recover from. Returns immediately on cancellation and on statuses that
//! will not resolve with retries.

use crate::error::RpcError;
use crate::status::StatusCode;
use porter_core::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives closures through exponential-backoff retries.
#[derive(Clone, Debug)]
pub struct Retrier {
    config: RetryConfig,
}

impl Retrier {
    /// Create a retrier from configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Classify an error as worth re-issuing.
    pub fn should_retry(&self, err: &RpcError) -> bool {
        match err {
            RpcError::Status(status) => matches!(
                status.code,
                StatusCode::Unavailable
                    | StatusCode::DeadlineExceeded
                    | StatusCode::ResourceExhausted
                    | StatusCode::Aborted
            ),
            RpcError::Io(_) | RpcError::TimedOut => true,
            RpcError::Cancelled
            | RpcError::ShortWrite { .. }
            | RpcError::Codec(_) => false,
        }
    }

    /// Run `op`, re-invoking it while it fails retriably and attempts remain.
    ///
    /// Backoff sleeps race the cancellation token; a cancelled token wins and
    /// surfaces as `RpcError::Cancelled`.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RpcError::Cancelled);
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !self.should_retry(&err) || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::debug!(attempt, ?delay, error = %err, "retrying after backoff");
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RpcError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Backoff delay before the given attempt (1-based): base doubled per
    /// attempt, capped at the configured ceiling.
    fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.config.max_delay_ms);
        Duration::from_millis(ms)
    }
}
