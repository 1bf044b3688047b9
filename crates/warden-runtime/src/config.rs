//! Runtime configuration.
//!
//! All durations serialize as integer milliseconds so YAML and JSON
//! configs stay unit-free:
//!
//! ```yaml
//! judge:
//!   model: claude-sonnet-4-20250514
//!   timeout: 30000
//!   retry:
//!     max_retries: 3
//!     initial_delay: 500
//! parallel: true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Serde adapter: `Duration` as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read configuration from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration for the judge client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Model identifier passed to the provider.
    pub model: String,

    /// Sampling temperature. Zero keeps judgements repeatable.
    pub temperature: f32,

    pub max_tokens: u32,

    /// Per-call deadline for one provider request.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,

    pub retry: RetryPolicy,

    pub circuit_breaker: CircuitBreakerConfig,

    pub cache: CacheConfig,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Judge result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    #[serde(with = "duration_ms")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Partial update applied to a live [`JudgeConfig`].
///
/// Absent fields keep their current values, so callers can adjust one
/// knob without restating the rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JudgeConfigUpdate {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default, with = "opt_duration_ms")]
    pub timeout: Option<Duration>,
    pub retry: Option<RetryPolicy>,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

mod opt_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

impl JudgeConfig {
    /// Apply a partial update, returning the merged configuration.
    pub fn merged(&self, update: &JudgeConfigUpdate) -> Self {
        Self {
            model: update.model.clone().unwrap_or_else(|| self.model.clone()),
            temperature: update.temperature.unwrap_or(self.temperature),
            max_tokens: update.max_tokens.unwrap_or(self.max_tokens),
            timeout: update.timeout.unwrap_or(self.timeout),
            retry: update.retry.clone().unwrap_or_else(|| self.retry.clone()),
            circuit_breaker: update
                .circuit_breaker
                .clone()
                .unwrap_or_else(|| self.circuit_breaker.clone()),
            cache: self.cache.clone(),
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub judge: JudgeConfig,

    /// Evaluate rules concurrently rather than one at a time.
    pub parallel: bool,
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = JudgeConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn yaml_durations_are_milliseconds() {
        let config = RuntimeConfig::from_yaml(
            r#"
judge:
  model: test-model
  timeout: 5000
  retry:
    max_retries: 2
    initial_delay: 100
    max_delay: 1000
    backoff_multiplier: 2.0
    jitter_factor: 0.0
  circuit_breaker:
    failure_threshold: 3
    reset_timeout: 60000
    half_open_success_threshold: 1
parallel: false
"#,
        )
        .unwrap();

        assert_eq!(config.judge.model, "test-model");
        assert_eq!(config.judge.timeout, Duration::from_secs(5));
        assert_eq!(config.judge.retry.initial_delay, Duration::from_millis(100));
        assert_eq!(
            config.judge.circuit_breaker.reset_timeout,
            Duration::from_secs(60)
        );
        assert!(!config.parallel);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config = RuntimeConfig::from_yaml("judge:\n  model: only-model\n").unwrap();
        assert_eq!(config.judge.model, "only-model");
        assert_eq!(config.judge.max_tokens, 1024);
    }

    #[test]
    fn merged_update_keeps_unset_fields() {
        let config = JudgeConfig::default();
        let update = JudgeConfigUpdate {
            temperature: Some(0.5),
            timeout: Some(Duration::from_secs(10)),
            ..JudgeConfigUpdate::default()
        };
        let merged = config.merged(&update);
        assert_eq!(merged.temperature, 0.5);
        assert_eq!(merged.timeout, Duration::from_secs(10));
        assert_eq!(merged.model, config.model);
        assert_eq!(merged.retry.max_retries, config.retry.max_retries);
    }

    #[test]
    fn config_roundtrips_through_yaml() {
        let config = RuntimeConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back = RuntimeConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back.judge.model, config.judge.model);
        assert_eq!(back.judge.timeout, config.judge.timeout);
    }
}
