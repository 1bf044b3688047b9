//! Policy validation and in-memory rule mutation.
//!
//! Validation never panics and never raises: problems come back as a
//! structured [`PolicyValidation`] with separate error and warning lists.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::policy::{EvaluationStrategy, Policy, Rule};

/// Outcome of validating a policy.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Errors from in-memory rule mutation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MutationError {
    #[error("rule '{0}' already exists")]
    DuplicateId(String),

    #[error("rule '{0}' not found")]
    UnknownId(String),
}

/// Validate a policy, collecting errors and warnings.
///
/// Strategy names are a closed enum, so an unknown strategy can only be
/// rejected at parse time; it never reaches this function.
pub fn validate_policy(policy: &Policy) -> PolicyValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if policy.name.trim().is_empty() {
        errors.push("policy name must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    for (index, rule) in policy.rules.iter().enumerate() {
        if rule.id.trim().is_empty() {
            errors.push(format!("rule {} has an empty id", index));
        } else if !seen.insert(rule.id.as_str()) {
            errors.push(format!("duplicate rule id '{}'", rule.id));
        }

        if rule.judge_prompt.trim().is_empty() {
            errors.push(format!("rule '{}' has an empty judge_prompt", rule.id));
        }

        if !(0.0..=1.0).contains(&rule.weight) {
            warnings.push(format!(
                "rule '{}' weight {} is outside [0, 1]",
                rule.id, rule.weight
            ));
        }
    }

    if policy.evaluation_strategy == EvaluationStrategy::WeightedThreshold {
        match policy.threshold {
            None => warnings.push(format!(
                "weighted_threshold policy has no threshold; defaulting to {}",
                crate::policy::DEFAULT_THRESHOLD
            )),
            Some(t) if !(0.0..=1.0).contains(&t) => {
                errors.push(format!("threshold {} must be within [0, 1]", t));
            }
            Some(_) => {}
        }
    }

    PolicyValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

impl Policy {
    /// Add a rule, rejecting duplicate ids.
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), MutationError> {
        if self.rule(&rule.id).is_some() {
            return Err(MutationError::DuplicateId(rule.id));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Replace the rule with `id`. A rename that collides with another
    /// existing rule is rejected.
    pub fn update_rule(&mut self, id: &str, rule: Rule) -> Result<(), MutationError> {
        let position = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| MutationError::UnknownId(id.to_string()))?;

        if rule.id != id && self.rule(&rule.id).is_some() {
            return Err(MutationError::DuplicateId(rule.id));
        }

        self.rules[position] = rule;
        Ok(())
    }

    /// Remove and return the rule with `id`.
    pub fn remove_rule(&mut self, id: &str) -> Result<Rule, MutationError> {
        let position = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| MutationError::UnknownId(id.to_string()))?;
        Ok(self.rules.remove(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Action;

    fn rule(id: &str) -> Rule {
        Rule {
            id: id.to_string(),
            description: None,
            judge_prompt: "criteria".to_string(),
            on_fail: Action::Block,
            weight: 1.0,
        }
    }

    fn base_policy() -> Policy {
        Policy {
            name: "p".to_string(),
            version: "1".to_string(),
            default_action: Action::Allow,
            rules: vec![rule("r1"), rule("r2")],
            evaluation_strategy: EvaluationStrategy::All,
            threshold: None,
        }
    }

    #[test]
    fn valid_policy_passes() {
        let validation = validate_policy(&base_policy());
        assert!(validation.valid);
        assert!(validation.errors.is_empty());
        assert!(validation.warnings.is_empty());
    }

    #[test]
    fn empty_name_and_prompt_are_errors() {
        let mut policy = base_policy();
        policy.name = " ".to_string();
        policy.rules[0].judge_prompt = String::new();

        let validation = validate_policy(&policy);
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 2);
    }

    #[test]
    fn duplicate_ids_are_errors() {
        let mut policy = base_policy();
        policy.rules.push(rule("r1"));

        let validation = validate_policy(&policy);
        assert!(!validation.valid);
        assert!(validation.errors.iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn out_of_range_weight_is_a_warning_not_error() {
        let mut policy = base_policy();
        policy.rules[0].weight = 2.5;

        let validation = validate_policy(&policy);
        assert!(validation.valid);
        assert_eq!(validation.warnings.len(), 1);
    }

    #[test]
    fn weighted_without_threshold_warns() {
        let mut policy = base_policy();
        policy.evaluation_strategy = EvaluationStrategy::WeightedThreshold;

        let validation = validate_policy(&policy);
        assert!(validation.valid);
        assert!(validation.warnings.iter().any(|w| w.contains("0.7")));
    }

    #[test]
    fn weighted_threshold_out_of_range_is_an_error() {
        let mut policy = base_policy();
        policy.evaluation_strategy = EvaluationStrategy::WeightedThreshold;
        policy.threshold = Some(1.5);

        let validation = validate_policy(&policy);
        assert!(!validation.valid);
    }

    #[test]
    fn add_rejects_duplicate() {
        let mut policy = base_policy();
        assert_eq!(
            policy.add_rule(rule("r1")),
            Err(MutationError::DuplicateId("r1".to_string()))
        );
        assert!(policy.add_rule(rule("r3")).is_ok());
        assert_eq!(policy.rules.len(), 3);
    }

    #[test]
    fn update_rejects_unknown_and_colliding_rename() {
        let mut policy = base_policy();
        assert_eq!(
            policy.update_rule("missing", rule("missing")),
            Err(MutationError::UnknownId("missing".to_string()))
        );
        // Renaming r1 to r2 collides.
        assert_eq!(
            policy.update_rule("r1", rule("r2")),
            Err(MutationError::DuplicateId("r2".to_string()))
        );
        // Renaming r1 to r9 is fine.
        assert!(policy.update_rule("r1", rule("r9")).is_ok());
        assert!(policy.rule("r9").is_some());
        assert!(policy.rule("r1").is_none());
    }

    #[test]
    fn remove_rejects_unknown() {
        let mut policy = base_policy();
        assert!(policy.remove_rule("r1").is_ok());
        assert_eq!(
            policy.remove_rule("r1"),
            Err(MutationError::UnknownId("r1".to_string()))
        );
    }
}
