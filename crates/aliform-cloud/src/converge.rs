//! Convergence poller
//!
//! Many control-plane mutations only enqueue a state transition. The poller
//! turns that into a synchronous "done" signal: it re-runs a status probe
//! until the object reports ready, reports a terminal failure, or the
//! deadline elapses.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Outcome of a single probe cycle
#[derive(Debug)]
pub enum PollOutcome {
    /// Terminal ready state reached
    Success,
    /// Still pending; the reason is kept for timeout diagnostics
    Retryable(String),
    /// Terminal failure; polling stops immediately
    Fatal(CloudError),
}

impl PollOutcome {
    pub fn retry(reason: impl Into<String>) -> Self {
        PollOutcome::Retryable(reason.into())
    }

    pub fn fatal(err: impl Into<CloudError>) -> Self {
        PollOutcome::Fatal(err.into())
    }
}

/// Backoff schedule between probe attempts
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the second probe
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor applied per attempt
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// Constant interval between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    pub fn exponential(initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// Delay after the given zero-based attempt, capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1.0 {
            return self.initial_delay.min(self.max_delay);
        }
        let factor = self.multiplier.powi(attempt.min(64) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Cooperative cancellation signal shared between a caller and its operations
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Drives a status probe to a terminal state
#[derive(Debug, Clone, Default)]
pub struct Converger {
    backoff: Backoff,
}

impl Converger {
    pub fn new(backoff: Backoff) -> Self {
        Self { backoff }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run `probe` until it succeeds, fails fatally, or `timeout` elapses
    ///
    /// The first probe runs immediately. Sleeps never extend past the
    /// deadline and are interrupted by `cancel`.
    pub async fn converge<F, Fut>(
        &self,
        cancel: &CancelToken,
        timeout: Duration,
        mut probe: F,
    ) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PollOutcome>,
    {
        let deadline = Instant::now() + timeout;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(CloudError::Cancelled);
            }

            let reason = match probe().await {
                PollOutcome::Success => {
                    tracing::debug!("Resource converged after {} retries", attempt);
                    return Ok(());
                }
                PollOutcome::Fatal(err) => {
                    return Err(CloudError::ConvergenceFatal(Box::new(err)));
                }
                PollOutcome::Retryable(reason) => reason,
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(CloudError::ConvergenceTimeout { timeout, reason });
            }

            let delay = self.backoff.delay_for_attempt(attempt).min(deadline - now);
            attempt += 1;
            tracing::debug!(
                "Not converged yet ({}), retrying in {:?} (attempt {})",
                reason,
                delay,
                attempt
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(CloudError::Cancelled),
            }
        }
    }
}
