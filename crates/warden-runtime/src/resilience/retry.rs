//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::duration_ms;

/// Retry configuration for judge calls.
///
/// Delay before attempt `n + 1` is `initial_delay * backoff_multiplier^(n-1)`,
/// capped at `max_delay`, plus a random jitter of up to `jitter_factor` of
/// the base delay. A rate-limit `retry-after` hint acts as a floor on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,

    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,

    #[serde(with = "duration_ms")]
    pub max_delay: Duration,

    pub backoff_multiplier: f64,

    /// Fraction of the base delay added as random jitter, in [0, 1].
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Deterministic backoff for a 1-based attempt number, before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let millis =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent as i32);
        Duration::from_millis((millis as u64).min(self.max_delay.as_millis() as u64))
    }

    /// Delay before retrying a failed attempt.
    ///
    /// When the provider supplied a `retry-after` hint, the hint is a floor:
    /// backoff never retries sooner than the provider asked.
    pub fn delay(&self, attempt: u32, retry_after_floor: Option<Duration>) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = base.mul_f64(self.jitter_factor * rand::thread_rng().gen::<f64>());
        let delay = base + jitter;
        match retry_after_floor {
            Some(floor) => delay.max(floor),
            None => delay,
        }
    }
}
