use std::{future::Future, time::Duration};

use tracing::warn;

/// Startup retry schedule for connectors: exponential, capped, bounded.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max_delay: Duration,
    /// Attempts made after the first one fails.
    pub retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            retries: 5,
        }
    }
}

impl BackoffPolicy {
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    /// Delay to wait after the `attempt`-th failure (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial.saturating_mul(factor).min(self.max_delay)
    }
}

pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: BackoffPolicy,
    what: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.retries => {
                let delay = policy.delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    retry_in_ms = delay.as_millis() as u64,
                    "{what} failed: {err}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
