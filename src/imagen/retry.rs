//! Retry utilities for Imagen API operations.
//!
//! Transfers are retried on any failure; status queries only on transient
//! ones. Both use a fixed attempt budget and a fixed (usually zero) delay.

use std::future::Future;
use std::time::Duration;

use super::error::ImagenError;

/// Default number of attempts for a single file upload or download.
pub const DEFAULT_TRANSFER_ATTEMPTS: u32 = 3;

/// Default number of attempts for one status query.
pub const DEFAULT_STATUS_ATTEMPTS: u32 = 5;

/// Attempt budget and pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Retry immediately, with no pause between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(DEFAULT_TRANSFER_ATTEMPTS)
    }
}

/// Run `op` until it succeeds, `should_retry` rejects the error, or the
/// policy's attempt budget is spent. Returns the last error on failure.
pub async fn retry_with<T, F, Fut, P>(
    policy: RetryPolicy,
    label: &str,
    should_retry: P,
    mut op: F,
) -> Result<T, ImagenError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ImagenError>>,
    P: Fn(&ImagenError) -> bool,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && should_retry(&e) => {
                log::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying...",
                    label,
                    attempt,
                    attempts,
                    e
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    log::error!("{} failed after {} attempts: {}", label, attempt, e);
                }
                return Err(e);
            }
        }
    }
}

/// Predicate for [`retry_with`] that retries every error.
pub fn any_error(_: &ImagenError) -> bool {
    true
}
