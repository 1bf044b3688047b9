//! Verdict types produced by judge calls and whole evaluations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{Action, EvaluationStrategy, Rule};

/// Per-rule outcome from the evaluation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Uncertain,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
            Verdict::Uncertain => f.write_str("UNCERTAIN"),
        }
    }
}

/// Policy-level outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FinalVerdict {
    Allow,
    Block,
    Warn,
    Redact,
    /// Orchestration failed before aggregation could run.
    Error,
}

impl From<Action> for FinalVerdict {
    fn from(action: Action) -> Self {
        match action {
            Action::Allow => FinalVerdict::Allow,
            Action::Warn => FinalVerdict::Warn,
            Action::Redact => FinalVerdict::Redact,
            Action::Block => FinalVerdict::Block,
        }
    }
}

impl fmt::Display for FinalVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalVerdict::Allow => f.write_str("ALLOW"),
            FinalVerdict::Block => f.write_str("BLOCK"),
            FinalVerdict::Warn => f.write_str("WARN"),
            FinalVerdict::Redact => f.write_str("REDACT"),
            FinalVerdict::Error => f.write_str("ERROR"),
        }
    }
}

/// Result of one judge call for one rule.
///
/// Produced exactly once per (rule, content) pair. Failures never escape
/// the judge client: they degrade into an `Uncertain` result carrying the
/// error metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResult {
    pub verdict: Verdict,

    /// Always within [0, 1] after normalization.
    pub confidence: f64,

    pub reasoning: String,

    pub latency_ms: u64,

    /// Present when the call degraded instead of completing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Category label for a degraded call, e.g. "TIMEOUT".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl JudgeResult {
    /// A successful judgement.
    pub fn new(verdict: Verdict, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            verdict,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            latency_ms: 0,
            error: None,
            error_kind: None,
        }
    }

    /// The degraded result synthesized when a judge call ultimately fails.
    pub fn degraded(
        reasoning: impl Into<String>,
        error: impl Into<String>,
        error_kind: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            verdict: Verdict::Uncertain,
            confidence: 0.0,
            reasoning: reasoning.into(),
            latency_ms,
            error: Some(error.into()),
            error_kind: Some(error_kind.into()),
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// A judge result bound to the rule that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,

    /// Copied from `rule.on_fail` at evaluation time.
    pub action: Action,

    /// Copied from `rule.weight` at evaluation time.
    pub weight: f64,

    #[serde(flatten)]
    pub judge: JudgeResult,
}

impl RuleResult {
    pub fn new(rule: &Rule, judge: JudgeResult) -> Self {
        Self {
            rule_id: rule.id.clone(),
            action: rule.on_fail,
            weight: rule.weight,
            judge,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.judge.verdict
    }
}

/// Summary attached to an aggregated verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub strategy: EvaluationStrategy,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub uncertain: usize,
    pub reason: String,

    /// Weighted strategy only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Weighted strategy only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Final, immutable output of one policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub final_verdict: FinalVerdict,
    pub passed: bool,
    pub rule_results: Vec<RuleResult>,

    /// Absent only on the `Error` path, which never reaches aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<AggregationSummary>,

    pub total_latency_ms: u64,
    pub evaluated_at: DateTime<Utc>,
    pub policy_name: String,
    pub policy_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PolicyVerdict {
    /// The verdict returned when orchestration fails before aggregation.
    pub fn orchestration_error(
        policy_name: impl Into<String>,
        policy_version: impl Into<String>,
        message: impl Into<String>,
        total_latency_ms: u64,
    ) -> Self {
        Self {
            final_verdict: FinalVerdict::Error,
            passed: false,
            rule_results: Vec::new(),
            summary: None,
            total_latency_ms,
            evaluated_at: Utc::now(),
            policy_name: policy_name.into(),
            policy_version: policy_version.into(),
            error: Some(message.into()),
        }
    }
}

/// Normalize a raw confidence value into [0, 1].
///
/// Values above 1 are read as a 0-100 scale. Missing or non-finite input
/// defaults to 0.5.
pub fn normalize_confidence(raw: Option<f64>) -> f64 {
    match raw {
        Some(v) if v.is_finite() => {
            let v = if v > 1.0 { v / 100.0 } else { v };
            v.clamp(0.0, 1.0)
        }
        _ => 0.5,
    }
}
