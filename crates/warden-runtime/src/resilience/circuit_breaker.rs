//! Circuit breaker to prevent cascade failures.
//!
//! When judge calls fail repeatedly, the circuit opens and subsequent
//! calls degrade immediately without touching the provider. After a
//! cooling-off period, a half-open probe admits traffic again.
//!
//! One judge client owns exactly one circuit; every concurrently-running
//! rule task shares it, so all state lives behind a lock.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::duration_ms;

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,

    /// Time before attempting recovery.
    #[serde(with = "duration_ms")]
    pub reset_timeout: Duration,

    /// Successes needed while half-open to close the circuit.
    pub half_open_success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_success_threshold: 2,
        }
    }
}

/// Observable circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// State transition produced by recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitTransition {
    /// Tripped open, carrying the failure count that tripped it. A
    /// failed half-open probe trips at 1, not at the closed threshold.
    Opened { failures: u32 },
    HalfOpened,
    Closed,
    Reset,
}

/// Whether a call may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitDecision {
    Proceed,
    /// The circuit is open; callers should degrade without calling out.
    Rejected { retry_in: Duration },
}

/// Point-in-time view of the breaker for reports and health endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    /// Milliseconds since the failure that opened the circuit, if open.
    pub last_failure_age_ms: Option<u64>,
    pub half_open_success_threshold: u32,
    pub half_open_success_count: u32,
    pub trip_count: u64,
}

#[derive(Debug, Clone, Copy)]
enum Inner {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { successes: u32 },
}

/// Circuit breaker shared by all rule tasks of one judge client.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<Inner>,
    config: RwLock<CircuitBreakerConfig>,
    trips: RwLock<u64>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: RwLock::new(Inner::Closed { failures: 0 }),
            config: RwLock::new(config),
            trips: RwLock::new(0),
        }
    }

    /// Gate a call attempt.
    ///
    /// An open circuit whose reset timeout has elapsed transitions to
    /// half-open and admits the call as a probe. The transition is
    /// reported so the caller can emit a notification.
    pub fn try_acquire(&self) -> (CircuitDecision, Option<CircuitTransition>) {
        let reset_timeout = self.config.read().reset_timeout;
        let mut state = self.state.write();
        match *state {
            Inner::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= reset_timeout {
                    *state = Inner::HalfOpen { successes: 0 };
                    tracing::info!("circuit transitioning to half-open for recovery probe");
                    (CircuitDecision::Proceed, Some(CircuitTransition::HalfOpened))
                } else {
                    (
                        CircuitDecision::Rejected {
                            retry_in: reset_timeout - elapsed,
                        },
                        None,
                    )
                }
            }
            _ => (CircuitDecision::Proceed, None),
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) -> Option<CircuitTransition> {
        let threshold = self.config.read().half_open_success_threshold;
        let mut state = self.state.write();
        match *state {
            Inner::HalfOpen { successes } => {
                if successes + 1 >= threshold {
                    *state = Inner::Closed { failures: 0 };
                    tracing::info!("circuit closed after successful recovery");
                    Some(CircuitTransition::Closed)
                } else {
                    *state = Inner::HalfOpen {
                        successes: successes + 1,
                    };
                    None
                }
            }
            Inner::Closed { .. } => {
                *state = Inner::Closed { failures: 0 };
                None
            }
            Inner::Open { .. } => None,
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) -> Option<CircuitTransition> {
        let threshold = self.config.read().failure_threshold;
        let mut state = self.state.write();
        match *state {
            Inner::Closed { failures } => {
                if failures + 1 >= threshold {
                    *state = Inner::Open {
                        opened_at: Instant::now(),
                    };
                    *self.trips.write() += 1;
                    tracing::warn!(failures = failures + 1, "circuit opened after repeated failures");
                    Some(CircuitTransition::Opened {
                        failures: failures + 1,
                    })
                } else {
                    *state = Inner::Closed {
                        failures: failures + 1,
                    };
                    None
                }
            }
            Inner::HalfOpen { .. } => {
                // A single failure during recovery re-trips.
                *state = Inner::Open {
                    opened_at: Instant::now(),
                };
                *self.trips.write() += 1;
                tracing::warn!("circuit reopened after failed recovery probe");
                Some(CircuitTransition::Opened { failures: 1 })
            }
            // Rejected calls do not refresh the recovery schedule.
            Inner::Open { .. } => None,
        }
    }

    /// Force the circuit closed.
    pub fn reset(&self) -> CircuitTransition {
        *self.state.write() = Inner::Closed { failures: 0 };
        tracing::info!("circuit manually reset to closed");
        CircuitTransition::Reset
    }

    pub fn state(&self) -> CircuitState {
        match *self.state.read() {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn trip_count(&self) -> u64 {
        *self.trips.read()
    }

    /// Hot-swap breaker thresholds. Current state is preserved.
    pub fn update_config(&self, config: CircuitBreakerConfig) {
        *self.config.write() = config;
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let config = self.config.read().clone();
        let state = self.state.read();
        let (state_label, failures, successes, last_failure_age_ms) = match *state {
            Inner::Closed { failures } => (CircuitState::Closed, failures, 0, None),
            Inner::Open { opened_at } => (
                CircuitState::Open,
                config.failure_threshold,
                0,
                Some(opened_at.elapsed().as_millis() as u64),
            ),
            Inner::HalfOpen { successes } => (CircuitState::HalfOpen, 0, successes, None),
        };
        CircuitBreakerSnapshot {
            state: state_label,
            failure_count: failures,
            failure_threshold: config.failure_threshold,
            reset_timeout_ms: config.reset_timeout.as_millis() as u64,
            last_failure_age_ms,
            half_open_success_threshold: config.half_open_success_threshold,
            half_open_success_count: successes,
            trip_count: *self.trips.read(),
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, reset_timeout: Duration, success_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            reset_timeout,
            half_open_success_threshold: success_threshold,
        })
    }

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::default();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(matches!(cb.try_acquire().0, CircuitDecision::Proceed));
    }

    #[test]
    fn opens_after_threshold_failures() {
        let cb = breaker(2, Duration::from_secs(30), 1);

        assert!(cb.record_failure().is_none());
        assert_eq!(cb.state(), CircuitState::Closed);

        assert_eq!(
            cb.record_failure(),
            Some(CircuitTransition::Opened { failures: 2 })
        );
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.trip_count(), 1);

        assert!(matches!(
            cb.try_acquire().0,
            CircuitDecision::Rejected { .. }
        ));
    }

    #[test]
    fn success_resets_failure_count() {
        let cb = breaker(3, Duration::from_secs(30), 1);

        cb.record_failure();
        cb.record_failure();
        cb.record_success();

        // Two more failures are not enough to reach the threshold again.
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_after_reset_timeout_then_closes() {
        let cb = breaker(1, Duration::from_millis(0), 2);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // Zero reset timeout: the next acquire probes immediately.
        let (decision, transition) = cb.try_acquire();
        assert!(matches!(decision, CircuitDecision::Proceed));
        assert_eq!(transition, Some(CircuitTransition::HalfOpened));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(cb.record_success().is_none());
        assert_eq!(cb.record_success(), Some(CircuitTransition::Closed));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().failure_count, 0);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let cb = breaker(1, Duration::from_millis(0), 2);

        cb.record_failure();
        let _ = cb.try_acquire();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // A failed probe trips at a single failure.
        assert_eq!(
            cb.record_failure(),
            Some(CircuitTransition::Opened { failures: 1 })
        );
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.trip_count(), 2);
    }

    #[test]
    fn manual_reset_forces_closed() {
        let cb = breaker(1, Duration::from_secs(300), 1);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(matches!(cb.try_acquire().0, CircuitDecision::Proceed));
    }

    #[test]
    fn snapshot_reflects_state() {
        let cb = breaker(5, Duration::from_secs(30), 2);
        cb.record_failure();
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 1);
        assert_eq!(snapshot.failure_threshold, 5);
        assert_eq!(snapshot.reset_timeout_ms, 30_000);
    }
}
