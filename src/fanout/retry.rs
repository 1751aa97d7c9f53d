//! Retry policy with capped exponential backoff.

use crate::completion::{CompletionRequest, CompletionService};
use crate::error::ServiceError;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Per-call retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; transient errors only.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Final result of a retried call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub result: Result<String, ServiceError>,
    /// Calls made, first attempt included.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Run one completion call with its own timeout, retrying transient failures.
///
/// Suspends only inside the service call and during backoff sleeps, so
/// dropping the returned future abandons the call cleanly.
pub async fn complete_with_retry(
    service: &dyn CompletionService,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> CallOutcome {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        debug!("completion attempt {} (model {})", attempt + 1, request.model);

        let result = match tokio::time::timeout(request.timeout, service.complete(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(ServiceError::timeout(format!(
                "no response within {:.1}s",
                request.timeout.as_secs_f64()
            ))),
        };

        match result {
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "transient failure ({}), retrying in {}ms [{}/{}]",
                    err,
                    delay.as_millis(),
                    attempt + 1,
                    policy.max_retries
                );
                sleep(delay).await;
                attempt += 1;
            }
            result => {
                return CallOutcome {
                    result,
                    attempts: attempt + 1,
                    elapsed: started.elapsed(),
                };
            }
        }
    }
}
