//! Async evaluation runtime for warden policies.
//!
//! This crate supplies everything `warden-core` deliberately leaves out:
//! LLM judge providers, the resilient judge client (retries, circuit
//! breaker, rate-limit tracking, caching, metrics), and the orchestrator
//! that fans rule judgements out and aggregates a policy verdict.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_core::Policy;
//! use warden_runtime::{JudgeClient, JudgeConfig, PolicyOrchestrator};
//! use warden_runtime::providers::MockJudgeProvider;
//!
//! let judge = Arc::new(JudgeClient::new(
//!     Arc::new(MockJudgeProvider::passing()),
//!     JudgeConfig::default(),
//! ));
//! let orchestrator = PolicyOrchestrator::builder(judge)
//!     .policy(Policy::from_yaml(POLICY_YAML)?)
//!     .build();
//! let verdict = orchestrator.evaluate("content under review").await;
//! ```

pub mod cache;
pub mod config;
pub mod events;
pub mod judge;
pub mod metrics;
pub mod normalize;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;

pub use cache::JudgeCache;
pub use config::{CacheConfig, ConfigError, JudgeConfig, JudgeConfigUpdate, RuntimeConfig};
pub use events::{EvaluationRecord, EventBus, EventSink, RuntimeEvent, TracingSink};
pub use judge::JudgeClient;
pub use metrics::{JudgeMetrics, MetricsReport};
pub use normalize::normalize_reply;
pub use orchestrator::{OrchestratorBuilder, PolicyOrchestrator};
pub use providers::{
    ErrorKind, JudgeProvider, JudgeReply, JudgeRequest, ProviderError, ProviderFactory,
    ProviderRegistry,
};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState, RetryPolicy,
};
