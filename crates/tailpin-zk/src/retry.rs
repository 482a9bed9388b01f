//! Retry logic and exponential backoff for ZooKeeper connections.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ZkError;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Initial retry delay
    pub initial_delay: Duration,

    /// Maximum retry delay
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f32,

    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f32,

    /// Retry timeout (total time across all attempts)
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Exponential backoff implementation
pub struct ExponentialBackoff {
    config: RetryConfig,
    attempt: u32,
    start_time: Instant,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff instance
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            start_time: Instant::now(),
        }
    }

    /// Check if we should retry
    pub fn should_retry(&self, error: &ZkError) -> bool {
        if self.attempt >= self.config.max_attempts {
            return false;
        }

        if self.start_time.elapsed() >= self.config.timeout {
            return false;
        }

        error.is_retryable()
    }

    /// Calculate delay for next retry
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;

        let base_delay = Duration::from_millis(
            (self.config.initial_delay.as_millis() as f32
                * self.config.backoff_multiplier.powi(self.attempt as i32 - 1)) as u64,
        );

        let capped_delay = base_delay.min(self.config.max_delay);

        // Add jitter to avoid thundering herd
        let jitter = if self.config.jitter_factor > 0.0 {
            let jitter_ms = (capped_delay.as_millis() as f32 * self.config.jitter_factor) as u64;
            Duration::from_millis(fastrand::u64(0..=jitter_ms))
        } else {
            Duration::ZERO
        };

        capped_delay + jitter
    }

    /// Get current attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Retry helper for async operations
pub async fn retry_async_with_backoff<F, Fut, T>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ZkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ZkError>>,
{
    let mut backoff = ExponentialBackoff::new(config);
    let mut last_error: Option<ZkError> = None;

    loop {
        match operation().await {
            Ok(result) => {
                if backoff.attempt() > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} attempts in {:?}",
                        operation_name,
                        backoff.attempt(),
                        backoff.elapsed()
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !backoff.should_retry(&error) {
                    if let Some(last_err) = last_error {
                        return Err(ZkError::RetryExhausted {
                            attempts: backoff.attempt(),
                            last_error: last_err.to_string(),
                        });
                    } else {
                        return Err(error);
                    }
                }

                let delay = backoff.next_delay();

                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}...",
                    operation_name,
                    backoff.attempt(),
                    backoff.config.max_attempts,
                    error,
                    delay
                );

                last_error = Some(error);
                sleep(delay).await;
            }
        }
    }
}
