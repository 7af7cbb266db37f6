//! Bounded polling with a fixed retry policy
//!
//! Used for the release poll (waiting for the source to publish an actual)
//! and for dependency polls on the pending result registry. Running out of
//! attempts is a normal outcome and surfaces as `None`, not as an error.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Max attempts and spacing for a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after an attempt that found nothing yet
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Delay after an attempt that failed outright
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    1000
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_error_backoff_ms() -> u64 {
    5000
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval_ms: interval.as_millis() as u64,
            error_backoff_ms: interval.as_millis() as u64,
        }
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Upper bound on the time a full poll can take
    pub fn ceiling(&self) -> Duration {
        self.interval() * self.max_attempts
    }
}

/// Result of a single polling attempt
#[derive(Debug)]
pub enum PollStep<T> {
    /// The awaited condition holds
    Ready(T),
    /// Not yet, wait the regular interval
    Pending,
    /// The attempt itself failed, wait the error backoff
    Failed,
}

/// Call `probe` until it reports `Ready` or the policy runs out of attempts
///
/// `probe` receives the zero-based attempt number.
pub async fn poll_until<T, F, Fut>(policy: &RetryPolicy, mut probe: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PollStep<T>>,
{
    for attempt in 0..policy.max_attempts {
        match probe(attempt).await {
            PollStep::Ready(value) => return Some(value),
            PollStep::Pending => sleep(policy.interval()).await,
            PollStep::Failed => sleep(policy.error_backoff()).await,
        }
    }
    debug!("Polling gave up after {} attempts", policy.max_attempts);
    None
}
