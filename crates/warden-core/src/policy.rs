//! Policy and rule definitions.
//!
//! A [`Policy`] is a named, versioned collection of [`Rule`]s plus the
//! strategy used to combine their verdicts. Policies are value objects:
//! the runtime swaps whole snapshots rather than mutating a live policy
//! under concurrent readers.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Threshold used by the weighted strategy when the policy omits one.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Errors loading or parsing a policy.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Enforcement action attached to a rule or policy.
///
/// Actions have a strict severity order used when several failed rules
/// disagree: `Block > Redact > Warn > Allow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Warn,
    Redact,
    Block,
}

impl Action {
    /// Severity rank. Higher wins.
    pub fn severity(self) -> u8 {
        match self {
            Action::Allow => 0,
            Action::Warn => 1,
            Action::Redact => 2,
            Action::Block => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Warn => "warn",
            Action::Redact => "redact",
            Action::Block => "block",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How per-rule verdicts combine into one policy verdict.
///
/// A closed enum rather than a name lookup: adding a strategy forces
/// every match site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStrategy {
    /// Every rule must pass; any failure decides the outcome.
    All,
    /// A single passing rule is enough to allow.
    Any,
    /// Weighted pass-score compared against a threshold.
    WeightedThreshold,
}

impl EvaluationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationStrategy::All => "all",
            EvaluationStrategy::Any => "any",
            EvaluationStrategy::WeightedThreshold => "weighted_threshold",
        }
    }
}

impl fmt::Display for EvaluationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluable criterion with its judge prompt and fallback action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier within the policy.
    pub id: String,

    /// Optional human-readable description, prepended to the judge prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Criteria text sent to the evaluation provider.
    pub judge_prompt: String,

    /// Action taken when this rule fails.
    pub on_fail: Action,

    /// Relative weight for the weighted strategy, conventionally in [0, 1].
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// A named collection of rules plus an aggregation strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Action applied when no failed rule dictates one.
    pub default_action: Action,

    /// Rules in dispatch order. Order never affects the decision.
    #[serde(default)]
    pub rules: Vec<Rule>,

    pub evaluation_strategy: EvaluationStrategy,

    /// Cutoff for `weighted_threshold`; defaults to [`DEFAULT_THRESHOLD`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Policy {
    /// Parse a policy from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a policy from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The threshold used by the weighted strategy.
    pub fn threshold_or_default(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Look up a rule by id.
    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }
}
