//! Aggregation strategies: fold many rule verdicts into one policy verdict.
//!
//! Every strategy is a pure function of the rule results and the policy.
//! No I/O, no randomness, no dependence on input order: the same multiset
//! of results always yields the same final verdict.

use crate::policy::{Action, EvaluationStrategy, Policy};
use crate::verdict::{AggregationSummary, FinalVerdict, RuleResult, Verdict};

/// Output of one aggregation pass.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub final_verdict: FinalVerdict,
    pub passed: bool,
    pub summary: AggregationSummary,
}

/// Aggregate rule results using the strategy named by the policy.
pub fn aggregate(policy: &Policy, results: &[RuleResult]) -> AggregationOutcome {
    match policy.evaluation_strategy {
        EvaluationStrategy::All => aggregate_all(results),
        EvaluationStrategy::Any => aggregate_any(results, policy.default_action),
        EvaluationStrategy::WeightedThreshold => {
            aggregate_weighted(results, policy.threshold_or_default())
        }
    }
}

#[derive(Default)]
struct Counts {
    passed: usize,
    failed: usize,
    uncertain: usize,
}

fn count(results: &[RuleResult]) -> Counts {
    let mut counts = Counts::default();
    for result in results {
        match result.verdict() {
            Verdict::Pass => counts.passed += 1,
            Verdict::Fail => counts.failed += 1,
            Verdict::Uncertain => counts.uncertain += 1,
        }
    }
    counts
}

/// The strictest `on_fail` action among failed rules, if any failed.
///
/// Ties are immaterial: equal severity means the same action name.
fn strictest_failed_action(results: &[RuleResult]) -> Option<Action> {
    results
        .iter()
        .filter(|r| r.verdict() == Verdict::Fail)
        .map(|r| r.action)
        .max_by_key(|a| a.severity())
}

fn summary(
    strategy: EvaluationStrategy,
    results: &[RuleResult],
    counts: &Counts,
    reason: String,
) -> AggregationSummary {
    AggregationSummary {
        strategy,
        total: results.len(),
        passed: counts.passed,
        failed: counts.failed,
        uncertain: counts.uncertain,
        reason,
        score: None,
        threshold: None,
    }
}

/// Every rule must pass. A failure decides the outcome; uncertainty alone
/// downgrades to a warning but still passes.
fn aggregate_all(results: &[RuleResult]) -> AggregationOutcome {
    let counts = count(results);

    if let Some(action) = strictest_failed_action(results) {
        let reason = format!(
            "{} rule(s) failed; strictest action is {}",
            counts.failed, action
        );
        return AggregationOutcome {
            final_verdict: action.into(),
            passed: false,
            summary: summary(EvaluationStrategy::All, results, &counts, reason),
        };
    }

    if counts.uncertain > 0 {
        let reason = format!("{} rule(s) uncertain, none failed", counts.uncertain);
        return AggregationOutcome {
            final_verdict: FinalVerdict::Warn,
            passed: true,
            summary: summary(EvaluationStrategy::All, results, &counts, reason),
        };
    }

    AggregationOutcome {
        final_verdict: FinalVerdict::Allow,
        passed: true,
        summary: summary(
            EvaluationStrategy::All,
            results,
            &counts,
            "All rules passed".to_string(),
        ),
    }
}

/// A single passing rule allows, regardless of other failures.
fn aggregate_any(results: &[RuleResult], default_action: Action) -> AggregationOutcome {
    let counts = count(results);

    if counts.passed > 0 {
        return AggregationOutcome {
            final_verdict: FinalVerdict::Allow,
            passed: true,
            summary: summary(
                EvaluationStrategy::Any,
                results,
                &counts,
                "At least one rule passed".to_string(),
            ),
        };
    }

    if counts.uncertain > 0 {
        let reason = format!("No rules passed; {} uncertain", counts.uncertain);
        return AggregationOutcome {
            final_verdict: FinalVerdict::Warn,
            passed: false,
            summary: summary(EvaluationStrategy::Any, results, &counts, reason),
        };
    }

    // All rules failed, or there were none. An empty rule set has no failed
    // action to escalate, so the policy default applies.
    let action = strictest_failed_action(results).unwrap_or(default_action);
    let reason = if results.is_empty() {
        "No rules evaluated".to_string()
    } else {
        format!("All rules failed; strictest action is {}", action)
    };
    AggregationOutcome {
        final_verdict: action.into(),
        passed: false,
        summary: summary(EvaluationStrategy::Any, results, &counts, reason),
    }
}

/// Weighted pass-score against a threshold.
///
/// Pass contributes full weight, uncertain half, fail nothing. When the
/// score falls short without any explicitly failed rule, the shortfall is
/// purely uncertainty and the outcome is a block.
fn aggregate_weighted(results: &[RuleResult], threshold: f64) -> AggregationOutcome {
    let counts = count(results);

    let mut total_weight = 0.0;
    let mut passed_weight = 0.0;
    for result in results {
        total_weight += result.weight;
        match result.verdict() {
            Verdict::Pass => passed_weight += result.weight,
            Verdict::Uncertain => passed_weight += result.weight / 2.0,
            Verdict::Fail => {}
        }
    }

    let score = if total_weight > 0.0 {
        passed_weight / total_weight
    } else {
        0.0
    };

    let (final_verdict, passed, reason) = if score >= threshold {
        (
            FinalVerdict::Allow,
            true,
            format!("Score {:.3} meets threshold {:.2}", score, threshold),
        )
    } else {
        let action = strictest_failed_action(results);
        let verdict = action.map(FinalVerdict::from).unwrap_or(FinalVerdict::Block);
        (
            verdict,
            false,
            format!("Score {:.3} below threshold {:.2}", score, threshold),
        )
    };

    let mut summary = summary(EvaluationStrategy::WeightedThreshold, results, &counts, reason);
    summary.score = Some(score);
    summary.threshold = Some(threshold);

    AggregationOutcome {
        final_verdict,
        passed,
        summary,
    }
}
