//! Provider factory pattern for dynamic judge provider registration.
//!
//! Providers register factories that create instances from JSON
//! configuration, so new backends can be added without touching an enum.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create("mock", &serde_json::json!({}))?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{JudgeProvider, MockJudgeProvider, ProviderError};

/// Factory for creating judge providers from configuration.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "anthropic".
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from JSON configuration.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn JudgeProvider>, ProviderError>;

    /// Validate configuration without creating a provider.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    /// Sensible defaults for optional fields.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    /// Human-readable description of this provider.
    fn description(&self) -> &'static str {
        "Judge provider"
    }
}

/// Registry mapping provider type names to their factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any existing one of the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Create a provider from type name and configuration.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn JudgeProvider>, ProviderError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "unknown provider type '{}'; available: {:?}",
                    provider_type,
                    self.available_types()
                ))
            })?
            .create(config)
    }

    /// Validate configuration for a provider type.
    pub fn validate(&self, provider_type: &str, config: &JsonValue) -> Result<(), ProviderError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("unknown provider type '{}'", provider_type))
            })?
            .validate_config(config)
    }

    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// A registry with all built-in providers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MockProviderFactory));
        #[cfg(feature = "anthropic")]
        registry.register(Arc::new(super::AnthropicProviderFactory));
        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}

/// Factory for the scripted mock provider.
pub struct MockProviderFactory;

impl ProviderFactory for MockProviderFactory {
    fn provider_type(&self) -> &'static str {
        "mock"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn JudgeProvider>, ProviderError> {
        let provider = match config["default"].as_str() {
            Some("fail") => MockJudgeProvider::failing(),
            _ => MockJudgeProvider::passing(),
        };
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        match config["default"].as_str() {
            None | Some("pass") | Some("fail") => Ok(()),
            Some(other) => Err(ProviderError::NotConfigured(format!(
                "mock 'default' must be 'pass' or 'fail', got '{}'",
                other
            ))),
        }
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "default": "pass" })
    }

    fn description(&self) -> &'static str {
        "Scripted mock provider for deterministic testing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_creates_mock_provider() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.has_provider("mock"));

        let provider = registry.create("mock", &serde_json::json!({})).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let registry = ProviderRegistry::new();
        let result = registry.create("nope", &serde_json::json!({}));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn mock_config_is_validated() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry
            .validate("mock", &serde_json::json!({ "default": "fail" }))
            .is_ok());
        assert!(registry
            .validate("mock", &serde_json::json!({ "default": "explode" }))
            .is_err());
    }
}
