//! Judge provider abstractions.
//!
//! This module defines the trait the judge client calls through, the
//! provider error surface, and the failure categorization used by the
//! retry and circuit-breaker logic.
//!
//! ## Security
//!
//! Live providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::Rule;

mod factory;
pub mod mock;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use mock::{MockBehavior, MockFailure, MockJudgeProvider};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};

/// Fallback applied when a rate-limited reply carries no usable hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_millis(60_000);

/// Errors from judge providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Failure categories driving retry and circuit decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Timeout,
    RateLimit,
    ServerError,
    AuthError,
    NetworkError,
    ParseError,
    Unknown,
}

impl ErrorKind {
    /// Only transient failures are worth another attempt. Auth and parse
    /// failures will not improve on retry.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::RateLimit
                | ErrorKind::ServerError
                | ErrorKind::NetworkError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::AuthError => "AUTH_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl ProviderError {
    /// Categorize this error. Typed variants map directly; untyped
    /// transport errors fall back to message heuristics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Timeout(_) => ErrorKind::Timeout,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimit,
            ProviderError::Auth(_) => ErrorKind::AuthError,
            ProviderError::Parse(_) => ErrorKind::ParseError,
            ProviderError::Network(_) => ErrorKind::NetworkError,
            ProviderError::Api { status, .. } => match status {
                429 => ErrorKind::RateLimit,
                401 | 403 => ErrorKind::AuthError,
                500..=599 => ErrorKind::ServerError,
                _ => ErrorKind::Unknown,
            },
            ProviderError::Http(message) => classify_message(message),
            ProviderError::NotConfigured(_) => ErrorKind::Unknown,
        }
    }

    /// How long a rate-limited caller should wait before retrying.
    ///
    /// Preference order: the typed hint, then the first integer in the
    /// provider message read as seconds, then [`DEFAULT_RETRY_AFTER`].
    pub fn retry_after_hint(&self) -> Duration {
        let message = match self {
            ProviderError::RateLimited {
                retry_after: Some(hint),
            } => return *hint,
            ProviderError::RateLimited { retry_after: None } => return DEFAULT_RETRY_AFTER,
            ProviderError::Api { message, .. } => message,
            ProviderError::Http(message)
            | ProviderError::Network(message)
            | ProviderError::Parse(message)
            | ProviderError::Auth(message)
            | ProviderError::NotConfigured(message) => message,
            ProviderError::Timeout(_) => return DEFAULT_RETRY_AFTER,
        };

        lazy_static! {
            static ref SECONDS: Regex = Regex::new(r"(\d+)").expect("static regex");
        }
        SECONDS
            .captures(message)
            .and_then(|c| c[1].parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER)
    }
}

/// Heuristic categorization for untyped transport errors.
fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("etimedout") || lower.contains("econnreset") {
        ErrorKind::Timeout
    } else if lower.contains("rate limit") || lower.contains("429") {
        ErrorKind::RateLimit
    } else if lower.contains("unauthorized") || lower.contains("forbidden") {
        ErrorKind::AuthError
    } else if lower.contains("dns")
        || lower.contains("connection refused")
        || lower.contains("connect error")
    {
        ErrorKind::NetworkError
    } else {
        ErrorKind::Unknown
    }
}

/// One judge call: criteria for one rule against one piece of content.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub rule_id: String,

    /// Rule description plus judge criteria, already combined.
    pub criteria: String,

    /// The content under judgement.
    pub content: String,

    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl JudgeRequest {
    pub fn for_rule(
        rule: &Rule,
        content: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            rule_id: rule.id.clone(),
            criteria: crate::prompts::criteria_for(rule),
            content: content.to_string(),
            model: model.to_string(),
            temperature,
            max_tokens,
            timeout,
        }
    }
}

/// Raw reply from a provider, before normalization.
#[derive(Debug, Clone)]
pub struct JudgeReply {
    /// Reply body: ideally JSON, but free text is tolerated.
    pub body: String,

    /// Model that produced the reply.
    pub model: String,
}

/// Provider abstraction allows swapping judge backends.
///
/// Implementations are selected at construction time; the judge client
/// never inspects which implementation it holds.
#[async_trait]
pub trait JudgeProvider: Send + Sync {
    /// Judge one rule against content.
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeReply, ProviderError>;

    /// Check reachability without consuming a rule slot.
    async fn health_check(&self) -> bool;

    /// Provider name for metrics and logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_map_to_kinds() {
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(5)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ProviderError::RateLimited { retry_after: None }.kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(
            ProviderError::Auth("bad key".into()).kind(),
            ErrorKind::AuthError
        );
        assert_eq!(
            ProviderError::Parse("not json".into()).kind(),
            ErrorKind::ParseError
        );
    }

    #[test]
    fn api_status_classes() {
        let server = ProviderError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(server.kind(), ErrorKind::ServerError);

        let auth = ProviderError::Api {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(auth.kind(), ErrorKind::AuthError);

        let limited = ProviderError::Api {
            status: 429,
            message: "slow down".into(),
        };
        assert_eq!(limited.kind(), ErrorKind::RateLimit);

        let odd = ProviderError::Api {
            status: 418,
            message: "teapot".into(),
        };
        assert_eq!(odd.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn message_heuristics_for_transport_errors() {
        assert_eq!(
            ProviderError::Http("operation timed out (ETIMEDOUT)".into()).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ProviderError::Http("connection refused".into()).kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(
            ProviderError::Http("something odd".into()).kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn retryability() {
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(ErrorKind::ServerError.is_retryable());
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(!ErrorKind::AuthError.is_retryable());
        assert!(!ErrorKind::ParseError.is_retryable());
        assert!(!ErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn retry_after_prefers_typed_hint() {
        let typed = ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(typed.retry_after_hint(), Duration::from_secs(7));
    }

    #[test]
    fn retry_after_parses_seconds_from_message() {
        let err = ProviderError::Api {
            status: 429,
            message: "rate limited, retry in 30 seconds".into(),
        };
        assert_eq!(err.retry_after_hint(), Duration::from_secs(30));

        let untyped = ProviderError::Http("please wait 12 seconds".into());
        assert_eq!(untyped.retry_after_hint(), Duration::from_secs(12));
    }

    #[test]
    fn retry_after_defaults_without_hint() {
        let err = ProviderError::RateLimited { retry_after: None };
        assert_eq!(err.retry_after_hint(), DEFAULT_RETRY_AFTER);

        let err = ProviderError::Http("no numbers here".into());
        assert_eq!(err.retry_after_hint(), DEFAULT_RETRY_AFTER);
    }
}
