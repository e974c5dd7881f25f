//! Long-running operation waiter (exponential backoff)
//!
//! Polls a pending create until it reaches a terminal state, the configured
//! timeout elapses, or the caller cancels.

use crate::error::{ErrorKind, RemoteError};
use crate::model::RemoteResource;
use crate::operations::{PendingOperation, PollStatus, RemoteResult, ResourceOperations};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;

/// Polling configuration for long-running creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Delay before the second poll (milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Upper bound for a single delay (milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Total time allowed for one create to finish (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_initial_delay() -> u64 {
    2000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_timeout() -> u64 {
    600
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            timeout_secs: default_timeout(),
        }
    }
}

impl WaitConfig {
    /// Delay after the given attempt (milliseconds), capped at `max_delay_ms`
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        // Never shrink between polls, whatever the configured multiplier
        let multiplier = if self.multiplier >= 1.0 { self.multiplier } else { 1.0 };
        let delay = self.initial_delay_ms as f64 * multiplier.powi(exponent);
        (delay as u64).min(self.max_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Wait for a pending create to finish
///
/// Returns the created resource on success, the remote failure if the
/// operation ended in error, a `Timeout` error once the deadline passes, or a
/// `Cancelled` error when `cancel` fires.
pub async fn wait_for_create<O>(
    ops: &O,
    operation: &PendingOperation,
    config: &WaitConfig,
    cancel: &CancellationToken,
) -> RemoteResult<RemoteResource>
where
    O: ResourceOperations + ?Sized,
{
    let deadline = Instant::now() + config.timeout();
    let mut attempt = 0u32;

    loop {
        // A stalled poll counts against the same deadline as the sleeps
        let status = tokio::select! {
            _ = cancel.cancelled() => return Err(RemoteError::cancelled()),
            status = timeout_at(deadline, ops.poll_create(operation)) => match status {
                Ok(status) => status?,
                Err(_) => return Err(timed_out(operation, config)),
            },
        };

        match status {
            PollStatus::Succeeded(resource) => return Ok(resource),
            PollStatus::Failed(error) => return Err(error),
            PollStatus::InProgress => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(operation, config));
        }

        let delay = Duration::from_millis(config.delay_for_attempt(attempt)).min(deadline - now);
        tracing::debug!(
            name = %operation.name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Create still in progress"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(RemoteError::cancelled()),
            _ = sleep(delay) => {}
        }
        attempt = attempt.saturating_add(1);
    }
}

fn timed_out(operation: &PendingOperation, config: &WaitConfig) -> RemoteError {
    RemoteError::new(
        ErrorKind::Timeout,
        format!(
            "{} did not finish provisioning within {}s",
            operation.name, config.timeout_secs
        ),
    )
}
