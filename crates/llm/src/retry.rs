//! Transport-level retry with exponential back-off.
//!
//! This sits below the pipeline's own attempt budgets: one generation attempt
//! may re-send its HTTP request a few times before the attempt is reported as
//! a fault.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::LlmError;

pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Runs `op` up to `1 + max_retries` times, retrying only errors whose
/// [`LlmError::retry_policy`] allows it.
pub async fn with_retry<F, Fut, T>(max_retries: u32, base_delay: Duration, op: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let policy = err.retry_policy();
                if attempt >= max_retries || !policy.is_retryable() {
                    return Err(err);
                }
                let delay = match policy {
                    pipeline::RetryPolicy::Retryable { after: Some(after) } => after,
                    _ => base_delay * 2u32.saturating_pow(attempt),
                };
                attempt += 1;
                tracing::warn!(
                    error = %err,
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "LLM request failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}
