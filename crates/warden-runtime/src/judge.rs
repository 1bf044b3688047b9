//! The judge client: resilient LLM calls for rule evaluation.
//!
//! `evaluate` never returns an error. Every failure mode, including an
//! open circuit and exhausted retries, degrades into an `Uncertain`
//! [`JudgeResult`] carrying the error metadata, so one struggling rule
//! cannot abort a policy evaluation.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use warden_core::{JudgeResult, Rule};

use crate::cache::JudgeCache;
use crate::config::{JudgeConfig, JudgeConfigUpdate};
use crate::events::{EventBus, RuntimeEvent};
use crate::metrics::{JudgeMetrics, MetricsReport};
use crate::normalize::normalize_reply;
use crate::providers::{ErrorKind, JudgeProvider, JudgeRequest, ProviderError};
use crate::resilience::{
    CircuitBreaker, CircuitBreakerSnapshot, CircuitDecision, CircuitTransition, RateLimitTracker,
};

/// Resilient client wrapping a judge provider.
///
/// Shared across all concurrently-evaluating rules of an orchestrator;
/// circuit state, rate-limit windows, and metrics are global to the
/// provider, not per rule.
pub struct JudgeClient {
    provider: Arc<dyn JudgeProvider>,
    config: RwLock<JudgeConfig>,
    circuit: CircuitBreaker,
    rate_limit: RateLimitTracker,
    metrics: JudgeMetrics,
    cache: Option<JudgeCache>,
    events: Arc<EventBus>,
}

impl std::fmt::Debug for JudgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeClient")
            .field("provider", &self.provider.name())
            .field("circuit", &self.circuit.state())
            .finish()
    }
}

/// Keeps `requests == successes + failures` when the evaluation future is
/// cancelled (e.g. by a caller deadline): a counted request whose outcome
/// was never recorded resolves to a failure on drop.
struct RequestGuard<'a> {
    metrics: &'a JudgeMetrics,
    armed: bool,
}

impl<'a> RequestGuard<'a> {
    fn new(metrics: &'a JudgeMetrics) -> Self {
        Self {
            metrics,
            armed: true,
        }
    }

    /// Call once the outcome has been recorded through other means.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.metrics.record_failure(ErrorKind::Unknown);
        }
    }
}

impl JudgeClient {
    pub fn new(provider: Arc<dyn JudgeProvider>, config: JudgeConfig) -> Self {
        Self::with_events(provider, config, Arc::new(EventBus::new()))
    }

    pub fn with_events(
        provider: Arc<dyn JudgeProvider>,
        config: JudgeConfig,
        events: Arc<EventBus>,
    ) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| JudgeCache::new(config.cache.max_entries, config.cache.ttl));
        let circuit = CircuitBreaker::new(config.circuit_breaker.clone());
        Self {
            provider,
            config: RwLock::new(config),
            circuit,
            rate_limit: RateLimitTracker::new(),
            metrics: JudgeMetrics::new(),
            cache,
            events,
        }
    }

    /// Evaluate one rule against content. Infallible by contract.
    pub async fn evaluate(&self, rule: &Rule, content: &str) -> JudgeResult {
        let started = Instant::now();
        self.metrics.record_request();
        let mut guard = RequestGuard::new(&self.metrics);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(rule, content).await {
                tracing::debug!(rule = %rule.id, "judge cache hit");
                guard.disarm();
                // A hit is a completed request served at ~zero latency.
                self.metrics.record_success(0);
                return hit;
            }
        }

        let (decision, transition) = self.circuit.try_acquire();
        if transition == Some(CircuitTransition::HalfOpened) {
            self.events.emit(RuntimeEvent::CircuitHalfOpen);
        }
        if let CircuitDecision::Rejected { retry_in } = decision {
            // A rejected call is a failure for metrics but must not touch
            // breaker state, or the circuit would never recover.
            guard.disarm();
            self.metrics.record_failure(ErrorKind::Unknown);
            tracing::warn!(
                rule = %rule.id,
                retry_in_ms = retry_in.as_millis() as u64,
                "judge call rejected by open circuit"
            );
            return JudgeResult::degraded(
                "Judge service unavailable",
                format!(
                    "circuit breaker open; retry in {}ms",
                    retry_in.as_millis()
                ),
                "SERVICE_UNAVAILABLE",
                started.elapsed().as_millis() as u64,
            );
        }

        let config = self.config.read().clone();
        let request = JudgeRequest::for_rule(
            rule,
            content,
            &config.model,
            config.temperature,
            config.max_tokens,
            config.timeout,
        );

        let max_attempts = config.retry.max_retries.max(1);
        let mut attempt = 1u32;

        loop {
            match self.attempt(&request).await {
                Ok(body) => {
                    self.rate_limit.clear();
                    if self.circuit.record_success() == Some(CircuitTransition::Closed) {
                        self.events.emit(RuntimeEvent::CircuitClosed);
                    }
                    let latency_ms = started.elapsed().as_millis() as u64;
                    guard.disarm();
                    self.metrics.record_success(latency_ms);

                    let result = normalize_reply(&body).with_latency(latency_ms);
                    if let Some(cache) = &self.cache {
                        cache.insert(rule, content, result.clone()).await;
                    }
                    return result;
                }
                Err(error) => {
                    let kind = error.kind();
                    tracing::debug!(
                        rule = %rule.id,
                        attempt,
                        kind = kind.as_str(),
                        error = %error,
                        "judge attempt failed"
                    );

                    let mut retry_floor = None;
                    if kind == ErrorKind::RateLimit {
                        let retry_after = error.retry_after_hint();
                        self.rate_limit.mark(retry_after);
                        self.events.emit(RuntimeEvent::RateLimited {
                            retry_after_ms: retry_after.as_millis() as u64,
                        });
                        retry_floor = Some(retry_after);
                    }

                    if kind.is_retryable() && attempt < max_attempts {
                        self.metrics.record_retry();
                        tokio::time::sleep(config.retry.delay(attempt, retry_floor)).await;
                        attempt += 1;
                        continue;
                    }

                    // Ultimate failure: one circuit mark per evaluate call,
                    // not one per attempt.
                    if let Some(CircuitTransition::Opened { failures }) =
                        self.circuit.record_failure()
                    {
                        self.metrics.record_trip();
                        self.events.emit(RuntimeEvent::CircuitOpened { failures });
                    }
                    guard.disarm();
                    self.metrics.record_failure(kind);

                    return JudgeResult::degraded(
                        format!("Judge evaluation failed: {}", kind.as_str()),
                        error.to_string(),
                        kind.as_str(),
                        started.elapsed().as_millis() as u64,
                    );
                }
            }
        }
    }

    /// One provider call under the configured deadline.
    async fn attempt(&self, request: &JudgeRequest) -> Result<String, ProviderError> {
        match tokio::time::timeout(request.timeout, self.provider.judge(request)).await {
            Ok(Ok(reply)) => Ok(reply.body),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(ProviderError::Timeout(request.timeout)),
        }
    }

    /// Apply a partial configuration update to the live client.
    pub fn update_config(&self, update: JudgeConfigUpdate) {
        let mut config = self.config.write();
        *config = config.merged(&update);
        if let Some(cb) = update.circuit_breaker {
            self.circuit.update_config(cb);
        }
    }

    pub fn config(&self) -> JudgeConfig {
        self.config.read().clone()
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    pub fn circuit_snapshot(&self) -> CircuitBreakerSnapshot {
        self.circuit.snapshot()
    }

    /// Manually force the circuit closed.
    pub fn reset_circuit_breaker(&self) {
        self.circuit.reset();
        self.events.emit(RuntimeEvent::CircuitReset);
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limit.is_limited()
    }

    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }

    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }
}
