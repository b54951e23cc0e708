//! Bounded retry with a fixed inter-attempt delay.
//!
//! Only the caller decides what counts as a failure: `op` returning `Err`
//! triggers another attempt, anything wrapped in `Ok` is final.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::ClientConfig;

/// Source of inter-attempt delays.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real delays backed by the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Retry limits for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero behaves as one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

/// All attempts failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.retry_count, Duration::from_secs(config.retry_delay))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, S>(&self, sleeper: &S, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        S: Sleeper,
    {
        let max_attempts = self.attempts();
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(attempt, max_attempts, error = %e, "Request attempt failed");

                    if attempt >= max_attempts {
                        tracing::error!(attempts = attempt, error = %e, "Request failed after final attempt");
                        return Err(Exhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }

                    sleeper.sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
