//! Resilience patterns for the judge client.
//!
//! This module provides:
//! - Circuit breaker to protect a struggling provider
//! - Retry policy with exponential backoff and jitter
//! - Rate-limit tracking orthogonal to circuit state

mod circuit_breaker;
mod rate_limit;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitDecision, CircuitState,
    CircuitTransition,
};
pub use rate_limit::RateLimitTracker;
pub use retry::RetryPolicy;
