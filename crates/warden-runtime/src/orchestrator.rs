//! Policy orchestration: fan out rule judgements, aggregate a verdict.
//!
//! The orchestrator owns the active policy, dispatches each rule to the
//! judge client (concurrently by default), and folds the results through
//! the policy's aggregation strategy into one [`PolicyVerdict`].
//!
//! Policy precedence per evaluation: an explicit per-call policy wins
//! over a runtime override, which wins over the configured policy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use warden_core::{
    aggregate, validate_policy, MutationError, Policy, PolicyValidation, PolicyVerdict, Rule,
    RuleResult,
};

use crate::events::{EvaluationRecord, EventBus, RuntimeEvent, TracingSink};
use crate::judge::JudgeClient;

/// Orchestrates policy evaluations against a judge client.
pub struct PolicyOrchestrator {
    judge: Arc<JudgeClient>,
    configured: RwLock<Option<Arc<Policy>>>,
    override_policy: RwLock<Option<Arc<Policy>>>,
    parallel: bool,
    events: Arc<EventBus>,
}

impl std::fmt::Debug for PolicyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyOrchestrator")
            .field("parallel", &self.parallel)
            .field(
                "policy",
                &self.configured.read().as_ref().map(|p| p.name.clone()),
            )
            .finish()
    }
}

impl PolicyOrchestrator {
    pub fn builder(judge: Arc<JudgeClient>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(judge)
    }

    /// Replace the configured policy.
    pub fn set_policy(&self, policy: Policy) {
        *self.configured.write() = Some(Arc::new(policy));
    }

    /// Install or clear a runtime override policy.
    pub fn set_override(&self, policy: Option<Policy>) {
        *self.override_policy.write() = policy.map(Arc::new);
    }

    /// The policy the next evaluation would use, override first.
    pub fn active_policy(&self) -> Option<Arc<Policy>> {
        self.override_policy
            .read()
            .clone()
            .or_else(|| self.configured.read().clone())
    }

    /// Evaluate content against the active policy.
    pub async fn evaluate(&self, content: &str) -> PolicyVerdict {
        self.evaluate_with(content, None).await
    }

    /// Evaluate content, optionally with a per-call policy.
    pub async fn evaluate_with(&self, content: &str, per_call: Option<&Policy>) -> PolicyVerdict {
        let started = Instant::now();

        let policy: Arc<Policy> = match per_call {
            Some(p) => Arc::new(p.clone()),
            None => match self.active_policy() {
                Some(p) => p,
                None => {
                    // The only path that produces an ERROR verdict: there is
                    // nothing to evaluate against.
                    let verdict = PolicyVerdict::orchestration_error(
                        "",
                        "",
                        "no policy configured",
                        started.elapsed().as_millis() as u64,
                    );
                    self.events.emit(RuntimeEvent::EvaluationFailed {
                        policy: String::new(),
                        error: "no policy configured".to_string(),
                        duration_ms: verdict.total_latency_ms,
                    });
                    return verdict;
                }
            },
        };

        self.events.emit(RuntimeEvent::EvaluationStarted {
            policy: policy.name.clone(),
            content_length: content.len(),
        });

        let results = if self.parallel {
            self.evaluate_rules_parallel(&policy.rules, content).await
        } else {
            self.evaluate_rules_sequential(&policy.rules, content).await
        };

        let outcome = aggregate(&policy, &results);
        let verdict = PolicyVerdict {
            final_verdict: outcome.final_verdict,
            passed: outcome.passed,
            rule_results: results,
            summary: Some(outcome.summary),
            total_latency_ms: started.elapsed().as_millis() as u64,
            evaluated_at: chrono::Utc::now(),
            policy_name: policy.name.clone(),
            policy_version: policy.version.clone(),
            error: None,
        };

        self.events.emit(RuntimeEvent::EvaluationCompleted {
            policy: policy.name.clone(),
            final_verdict: verdict.final_verdict,
            passed: verdict.passed,
            duration_ms: verdict.total_latency_ms,
        });
        self.events.record(&EvaluationRecord {
            content: content.to_string(),
            policy: (*policy).clone(),
            verdict: verdict.clone(),
        });

        verdict
    }

    /// Evaluate with an overall deadline across all rules.
    ///
    /// A deadline hit degrades to an orchestration error rather than a
    /// partial verdict.
    pub async fn evaluate_with_deadline(
        &self,
        content: &str,
        per_call: Option<&Policy>,
        deadline: Duration,
    ) -> PolicyVerdict {
        let started = Instant::now();
        match tokio::time::timeout(deadline, self.evaluate_with(content, per_call)).await {
            Ok(verdict) => verdict,
            Err(_) => {
                let (name, version) = per_call
                    .map(|p| (p.name.clone(), p.version.clone()))
                    .or_else(|| {
                        self.active_policy()
                            .map(|p| (p.name.clone(), p.version.clone()))
                    })
                    .unwrap_or_default();
                PolicyVerdict::orchestration_error(
                    name,
                    version,
                    format!("evaluation exceeded deadline of {}ms", deadline.as_millis()),
                    started.elapsed().as_millis() as u64,
                )
            }
        }
    }

    async fn evaluate_rules_parallel(&self, rules: &[Rule], content: &str) -> Vec<RuleResult> {
        let tasks = rules.iter().map(|rule| async {
            let result = self.judge.evaluate(rule, content).await;
            RuleResult::new(rule, result)
        });
        futures::future::join_all(tasks).await
    }

    async fn evaluate_rules_sequential(&self, rules: &[Rule], content: &str) -> Vec<RuleResult> {
        let mut results = Vec::with_capacity(rules.len());
        for rule in rules {
            let result = self.judge.evaluate(rule, content).await;
            results.push(RuleResult::new(rule, result));
        }
        results
    }

    /// Validate a policy without installing it.
    pub fn validate(&self, policy: &Policy) -> PolicyValidation {
        validate_policy(policy)
    }

    /// Add a rule to the configured policy.
    pub fn add_rule(&self, rule: Rule) -> Result<(), MutationError> {
        self.mutate_configured(|policy| policy.add_rule(rule))
    }

    /// Replace a rule in the configured policy.
    pub fn update_rule(&self, id: &str, rule: Rule) -> Result<(), MutationError> {
        self.mutate_configured(|policy| policy.update_rule(id, rule))
    }

    /// Remove a rule from the configured policy.
    pub fn remove_rule(&self, id: &str) -> Result<Rule, MutationError> {
        self.mutate_configured(|policy| policy.remove_rule(id))
    }

    /// Clone-mutate-swap so in-flight evaluations keep their snapshot.
    fn mutate_configured<T>(
        &self,
        mutate: impl FnOnce(&mut Policy) -> Result<T, MutationError>,
    ) -> Result<T, MutationError> {
        let mut slot = self.configured.write();
        let mut policy = match slot.as_deref() {
            Some(p) => p.clone(),
            None => return Err(MutationError::UnknownId("no policy configured".to_string())),
        };
        let value = mutate(&mut policy)?;
        *slot = Some(Arc::new(policy));
        Ok(value)
    }

    pub fn judge(&self) -> &Arc<JudgeClient> {
        &self.judge
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }
}

/// Builder for [`PolicyOrchestrator`].
pub struct OrchestratorBuilder {
    judge: Arc<JudgeClient>,
    policy: Option<Policy>,
    parallel: bool,
    events: Option<Arc<EventBus>>,
    tracing_sink: bool,
}

impl OrchestratorBuilder {
    pub fn new(judge: Arc<JudgeClient>) -> Self {
        Self {
            judge,
            policy: None,
            parallel: true,
            events: None,
            tracing_sink: true,
        }
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Skip the default tracing sink.
    pub fn without_tracing_sink(mut self) -> Self {
        self.tracing_sink = false;
        self
    }

    pub fn build(self) -> PolicyOrchestrator {
        let events = self.events.unwrap_or_else(|| self.judge.events());
        if self.tracing_sink {
            events.subscribe(Arc::new(TracingSink));
        }
        PolicyOrchestrator {
            judge: self.judge,
            configured: RwLock::new(self.policy.map(Arc::new)),
            override_policy: RwLock::new(None),
            parallel: self.parallel,
            events,
        }
    }
}
