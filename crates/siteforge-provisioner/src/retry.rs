use std::future::Future;
use std::time::Duration;

use rand::Rng;
use siteforge_core::error::ReconcileError;

use crate::config::RetryPolicy;

impl RetryPolicy {
    /// Jittered exponential delay for a zero-based attempt number.
    /// The jitter window is [half, full] of the capped exponential value.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let millis = exp.as_millis() as u64;
        if millis == 0 {
            return Duration::ZERO;
        }
        let jittered = millis / 2 + rand::thread_rng().gen_range(0..=millis / 2);
        Duration::from_millis(jittered)
    }
}

/// Run `op` until it succeeds, fails non-transiently, or exhausts the
/// policy's attempts. Only transient errors (throttling, 5xx-class) are
/// retried; validation, auth, conflict and ambiguity surface immediately.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, ReconcileError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReconcileError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    op = what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient provider error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
