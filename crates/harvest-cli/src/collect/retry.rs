//! Fetch-with-retry
//!
//! Attempt `k` (1-based) that fails with a retryable error is followed by a sleep of
//! `base_delay * k` before attempt `k + 1`. After `max_retries` attempts the last
//! error is returned as [`FetchOutcome::TransientFailure`].

use crate::api::{FetchError, JsonTransport};
use crate::collect::CollectError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Which request failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryOn {
    /// Transport errors, timeouts, error statuses and undecodable bodies alike
    #[default]
    Any,
    /// Only timeouts and connection-level failures
    Transport,
}

impl RetryOn {
    pub fn should_retry(self, err: &FetchError) -> bool {
        match self {
            RetryOn::Any => true,
            RetryOn::Transport => err.is_transport(),
        }
    }
}

impl FromStr for RetryOn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" | "all" => Ok(RetryOn::Any),
            "transport" | "network" => Ok(RetryOn::Transport),
            other => Err(format!("unknown retry policy '{}'", other)),
        }
    }
}

impl fmt::Display for RetryOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOn::Any => write!(f, "any"),
            RetryOn::Transport => write!(f, "transport"),
        }
    }
}

/// Retry settings for one request
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retry_on: RetryOn,
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            retry_on: RetryOn::Any,
        }
    }
}

/// Result of fetch-with-retry
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Ok(T),
    /// All attempts failed with retryable errors
    TransientFailure { attempts: u32, last_error: FetchError },
    /// A failure the policy does not retry
    Fatal(FetchError),
}

impl<T> FetchOutcome<T> {
    /// Convert into a `Result`, attaching the request path to failures
    pub fn into_result(self, path: &str) -> Result<T, CollectError> {
        match self {
            FetchOutcome::Ok(value) => Ok(value),
            FetchOutcome::TransientFailure {
                attempts,
                last_error,
            } => Err(CollectError::RetriesExhausted {
                path: path.to_string(),
                attempts,
                source: last_error,
            }),
            FetchOutcome::Fatal(source) => Err(CollectError::Fatal {
                path: path.to_string(),
                source,
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FetchOutcome::Ok(_))
    }
}

/// Suspends the current task; swapped out in tests to record delays
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// GET `path` through `transport`, retrying per `policy`
pub async fn fetch_with_retry<T, S>(
    transport: &T,
    sleeper: &S,
    policy: &RetryPolicy,
    path: &str,
) -> FetchOutcome<Value>
where
    T: JsonTransport + ?Sized,
    S: Sleeper + ?Sized,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 1;

    loop {
        match transport.get_json(path).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(path, attempt, "Request succeeded after retry");
                }
                return FetchOutcome::Ok(value);
            },
            Err(err) if !policy.retry_on.should_retry(&err) => {
                warn!(path, attempt, error = %err, "Request failed, not retrying");
                return FetchOutcome::Fatal(err);
            },
            Err(err) if attempt >= max_attempts => {
                warn!(path, attempts = attempt, error = %err, "Request failed, retries exhausted");
                return FetchOutcome::TransientFailure {
                    attempts: attempt,
                    last_error: err,
                };
            },
            Err(err) => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    path,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Request failed, backing off"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
