//! # warden-core
//!
//! Deterministic policy model and verdict aggregation for Warden.
//!
//! This crate holds everything that does not touch the network:
//! - The policy model: rules, enforcement actions, evaluation strategies
//! - Verdict types produced by judge calls and by whole evaluations
//! - The aggregation strategies that fold per-rule verdicts into one
//!   policy verdict
//! - Policy validation and in-memory rule mutation
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: aggregation is a pure function of its inputs
//! 2. **Order-independent**: the same multiset of rule results always
//!    yields the same final verdict
//! 3. **No I/O, no async**: judge calls live in `warden-runtime`
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_core::{aggregate, Policy};
//!
//! let policy = Policy::from_yaml_file("policy.yaml")?;
//! let outcome = aggregate(&policy, &rule_results);
//! println!("{}: {}", outcome.final_verdict, outcome.summary.reason);
//! ```

pub mod aggregation;
pub mod policy;
pub mod validation;
pub mod verdict;

pub use aggregation::{aggregate, AggregationOutcome};
pub use policy::{
    Action, EvaluationStrategy, Policy, PolicyError, Rule, DEFAULT_THRESHOLD,
};
pub use validation::{validate_policy, MutationError, PolicyValidation};
pub use verdict::{
    normalize_confidence, AggregationSummary, FinalVerdict, JudgeResult, PolicyVerdict,
    RuleResult, Verdict,
};
