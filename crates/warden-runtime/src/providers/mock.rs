//! Programmable stand-in provider for deterministic testing.
//!
//! Behaviors are scripted per rule id: a fixed reply, a function of the
//! content, or an injected failure. Unscripted rules use a configurable
//! default. Every call is counted so tests can assert the provider was
//! (or was not) reached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{JudgeProvider, JudgeReply, JudgeRequest, ProviderError};

/// A failure injected in place of a reply.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Timeout,
    RateLimited { retry_after: Option<Duration> },
    ServerError { status: u16 },
    Auth,
    Network,
    Parse,
}

impl MockFailure {
    fn into_error(self, request: &JudgeRequest) -> ProviderError {
        match self {
            MockFailure::Timeout => ProviderError::Timeout(request.timeout),
            MockFailure::RateLimited { retry_after } => {
                ProviderError::RateLimited { retry_after }
            }
            MockFailure::ServerError { status } => ProviderError::Api {
                status,
                message: "injected server error".to_string(),
            },
            MockFailure::Auth => ProviderError::Auth("injected auth failure".to_string()),
            MockFailure::Network => {
                ProviderError::Network("injected: connection refused".to_string())
            }
            MockFailure::Parse => ProviderError::Parse("injected parse failure".to_string()),
        }
    }
}

type ReplyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Scripted behavior for one rule id.
#[derive(Clone)]
pub enum MockBehavior {
    /// Return this body verbatim.
    Reply(String),
    /// Compute the body from the content under judgement.
    WithContent(ReplyFn),
    /// Fail with the given error.
    Fail(MockFailure),
}

impl MockBehavior {
    /// A well-formed JSON reply body carrying the given verdict token.
    pub fn body(token: &str, confidence: f64, reasoning: &str) -> String {
        serde_json::json!({
            "verdict": token,
            "confidence": confidence,
            "reasoning": reasoning,
        })
        .to_string()
    }

    /// A fixed reply carrying the given verdict token.
    pub fn verdict(token: &str, confidence: f64, reasoning: &str) -> Self {
        MockBehavior::Reply(Self::body(token, confidence, reasoning))
    }

    pub fn pass_body() -> String {
        Self::body("PASS", 0.95, "content satisfies the criteria")
    }

    pub fn fail_body() -> String {
        Self::body("FAIL", 0.95, "content violates the criteria")
    }

    pub fn pass() -> Self {
        MockBehavior::Reply(Self::pass_body())
    }

    pub fn fail() -> Self {
        MockBehavior::Reply(Self::fail_body())
    }

    pub fn uncertain() -> Self {
        Self::verdict("UNCERTAIN", 0.5, "insufficient evidence")
    }
}

impl std::fmt::Debug for MockBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockBehavior::Reply(body) => f.debug_tuple("Reply").field(body).finish(),
            MockBehavior::WithContent(_) => f.write_str("WithContent(..)"),
            MockBehavior::Fail(failure) => f.debug_tuple("Fail").field(failure).finish(),
        }
    }
}

/// Judge provider with scripted, deterministic behavior.
#[derive(Debug)]
pub struct MockJudgeProvider {
    behaviors: RwLock<HashMap<String, MockBehavior>>,
    default_behavior: RwLock<MockBehavior>,
    total_calls: AtomicU64,
    calls_by_rule: RwLock<HashMap<String, u64>>,
    healthy: RwLock<bool>,
}

impl MockJudgeProvider {
    pub fn new(default_behavior: MockBehavior) -> Self {
        Self {
            behaviors: RwLock::new(HashMap::new()),
            default_behavior: RwLock::new(default_behavior),
            total_calls: AtomicU64::new(0),
            calls_by_rule: RwLock::new(HashMap::new()),
            healthy: RwLock::new(true),
        }
    }

    /// Every unscripted rule passes.
    pub fn passing() -> Self {
        Self::new(MockBehavior::pass())
    }

    /// Every unscripted rule fails.
    pub fn failing() -> Self {
        Self::new(MockBehavior::fail())
    }

    /// Script the behavior for one rule id.
    pub fn script(&self, rule_id: impl Into<String>, behavior: MockBehavior) {
        self.behaviors.write().insert(rule_id.into(), behavior);
    }

    /// Builder-style scripting for test setup.
    pub fn with(self, rule_id: impl Into<String>, behavior: MockBehavior) -> Self {
        self.script(rule_id, behavior);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.write() = healthy;
    }

    /// Total provider calls across all rules.
    pub fn calls(&self) -> u64 {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Provider calls for one rule id.
    pub fn calls_for(&self, rule_id: &str) -> u64 {
        self.calls_by_rule.read().get(rule_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl JudgeProvider for MockJudgeProvider {
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeReply, ProviderError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_rule
            .write()
            .entry(request.rule_id.clone())
            .or_insert(0) += 1;

        let behavior = self
            .behaviors
            .read()
            .get(&request.rule_id)
            .cloned()
            .unwrap_or_else(|| self.default_behavior.read().clone());

        let body = match behavior {
            MockBehavior::Reply(body) => body,
            MockBehavior::WithContent(reply_fn) => reply_fn(&request.content),
            MockBehavior::Fail(failure) => return Err(failure.into_error(request)),
        };

        Ok(JudgeReply {
            body,
            model: "mock".to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        *self.healthy.read()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
