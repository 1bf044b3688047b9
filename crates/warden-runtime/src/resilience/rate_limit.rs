//! Rate-limit window tracking.
//!
//! Rate limiting is tracked separately from the circuit breaker: a 429
//! means the provider is healthy but throttling us, which should not
//! count toward opening the circuit at the same cadence as hard failures.

use std::time::{Duration, Instant};

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy)]
struct Window {
    since: Instant,
    retry_after: Duration,
}

/// Tracks the most recent rate-limit window reported by the provider.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    window: RwLock<Option<Window>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rate-limit response with its retry-after duration.
    pub fn mark(&self, retry_after: Duration) {
        *self.window.write() = Some(Window {
            since: Instant::now(),
            retry_after,
        });
    }

    /// Clear the window after a successful call.
    pub fn clear(&self) {
        *self.window.write() = None;
    }

    /// Whether we are still inside the last reported window.
    pub fn is_limited(&self) -> bool {
        self.window
            .read()
            .map(|w| w.since.elapsed() < w.retry_after)
            .unwrap_or(false)
    }

    /// Time remaining in the current window, if any.
    pub fn retry_after_remaining(&self) -> Option<Duration> {
        self.window.read().and_then(|w| {
            let elapsed = w.since.elapsed();
            if elapsed < w.retry_after {
                Some(w.retry_after - elapsed)
            } else {
                None
            }
        })
    }
}
