//! Bounded exponential backoff for chat calls.
//!
//! Delay before retry `n` (1-based) is `min(cap, base * 2^(n-1))`, stretched by
//! up to `jitter` of itself. Only [`ChatError::is_transient`] failures are
//! retried.

use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::io::error::{ChatError, CollaboratorError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
    /// Fractional jitter in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_secs: 0.5,
            max_delay_secs: 10.0,
            jitter: 0.3,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without sleeping.
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_secs: 0.0,
            max_delay_secs: 0.0,
            jitter: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("retry.max_attempts must be > 0");
        }
        if self.base_delay_secs < 0.0 || self.max_delay_secs < self.base_delay_secs {
            bail!("retry delays must satisfy 0 <= base_delay_secs <= max_delay_secs");
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            bail!("retry.jitter must be within [0, 1]");
        }
        Ok(())
    }

    /// Backoff before retry `attempt` (1-based), with `unit` in `[0, 1)` scaling the jitter.
    pub fn backoff(&self, attempt: u32, unit: f64) -> Duration {
        let exp = attempt.saturating_sub(1).min(30);
        let raw = (self.base_delay_secs * f64::from(1u32 << exp)).min(self.max_delay_secs);
        Duration::from_secs_f64(raw * (1.0 + self.jitter * unit))
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    pub fn run<T>(
        &self,
        collaborator: &str,
        mut op: impl FnMut() -> Result<T, ChatError>,
    ) -> Result<T, CollaboratorError> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(collaborator, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_transient() => {
                    return Err(CollaboratorError::Rejected {
                        collaborator: collaborator.to_string(),
                        source: err,
                    });
                }
                Err(err) if attempt >= self.max_attempts => {
                    warn!(collaborator, attempts = attempt, error = %err, "giving up");
                    return Err(CollaboratorError::Exhausted {
                        collaborator: collaborator.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    let delay = self.backoff(attempt, rand::thread_rng().r#gen::<f64>());
                    warn!(
                        collaborator,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
