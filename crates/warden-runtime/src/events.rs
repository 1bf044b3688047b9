//! Runtime event notifications.
//!
//! The judge client and orchestrator emit events through an [`EventBus`];
//! sinks subscribe to observe evaluations and circuit transitions without
//! the runtime knowing where notifications go. The default
//! [`TracingSink`] forwards everything to structured logs.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use warden_core::{FinalVerdict, Policy, PolicyVerdict};

/// An event emitted by the runtime.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    EvaluationStarted {
        policy: String,
        content_length: usize,
    },
    EvaluationCompleted {
        policy: String,
        final_verdict: FinalVerdict,
        passed: bool,
        duration_ms: u64,
    },
    EvaluationFailed {
        policy: String,
        error: String,
        duration_ms: u64,
    },
    CircuitOpened {
        failures: u32,
    },
    CircuitHalfOpen,
    CircuitClosed,
    CircuitReset,
    RateLimited {
        retry_after_ms: u64,
    },
}

/// A completed evaluation with its full inputs, for audit sinks.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    pub content: String,
    pub policy: Policy,
    pub verdict: PolicyVerdict,
}

/// Receives runtime events.
///
/// `emit` must not block: it runs inline on the evaluation path.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RuntimeEvent);

    /// Full evaluation records, for sinks that audit rather than observe.
    fn record(&self, _record: &EvaluationRecord) {}
}

/// Fan-out bus for runtime events.
#[derive(Default)]
pub struct EventBus {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    pub fn emit(&self, event: RuntimeEvent) {
        for sink in self.sinks.read().iter() {
            sink.emit(&event);
        }
    }

    pub fn record(&self, record: &EvaluationRecord) {
        for sink in self.sinks.read().iter() {
            sink.record(record);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::EvaluationStarted {
                policy,
                content_length,
            } => {
                tracing::info!(policy, content_length, "evaluation started");
            }
            RuntimeEvent::EvaluationCompleted {
                policy,
                final_verdict,
                passed,
                duration_ms,
            } => {
                tracing::info!(
                    policy,
                    verdict = %final_verdict,
                    passed,
                    duration_ms,
                    "evaluation completed"
                );
            }
            RuntimeEvent::EvaluationFailed {
                policy,
                error,
                duration_ms,
            } => {
                tracing::error!(policy, error, duration_ms, "evaluation failed");
            }
            RuntimeEvent::CircuitOpened { failures } => {
                tracing::warn!(failures, "circuit breaker opened");
            }
            RuntimeEvent::CircuitHalfOpen => {
                tracing::info!("circuit breaker half-open");
            }
            RuntimeEvent::CircuitClosed => {
                tracing::info!("circuit breaker closed");
            }
            RuntimeEvent::CircuitReset => {
                tracing::info!("circuit breaker reset");
            }
            RuntimeEvent::RateLimited { retry_after_ms } => {
                tracing::warn!(retry_after_ms, "provider rate limited");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingSink {
        events: Mutex<Vec<String>>,
        records: Mutex<usize>,
    }

    impl EventSink for CapturingSink {
        fn emit(&self, event: &RuntimeEvent) {
            let label = match event {
                RuntimeEvent::EvaluationStarted { .. } => "started",
                RuntimeEvent::EvaluationCompleted { .. } => "completed",
                RuntimeEvent::EvaluationFailed { .. } => "failed",
                RuntimeEvent::CircuitOpened { .. } => "opened",
                RuntimeEvent::CircuitHalfOpen => "half_open",
                RuntimeEvent::CircuitClosed => "closed",
                RuntimeEvent::CircuitReset => "reset",
                RuntimeEvent::RateLimited { .. } => "rate_limited",
            };
            self.events.lock().unwrap().push(label.to_string());
        }

        fn record(&self, _record: &EvaluationRecord) {
            *self.records.lock().unwrap() += 1;
        }
    }

    #[test]
    fn bus_fans_out_to_all_sinks() {
        let bus = EventBus::new();
        let a = Arc::new(CapturingSink::default());
        let b = Arc::new(CapturingSink::default());
        bus.subscribe(a.clone());
        bus.subscribe(b.clone());

        bus.emit(RuntimeEvent::CircuitOpened { failures: 5 });

        assert_eq!(*a.events.lock().unwrap(), vec!["opened"]);
        assert_eq!(*b.events.lock().unwrap(), vec!["opened"]);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(RuntimeEvent::EvaluationStarted {
            policy: "p".to_string(),
            content_length: 42,
        })
        .unwrap();
        assert_eq!(json["type"], "evaluation_started");
        assert_eq!(json["content_length"], 42);
    }

    #[test]
    fn empty_bus_is_a_no_op() {
        let bus = EventBus::new();
        bus.emit(RuntimeEvent::CircuitReset);
    }
}
