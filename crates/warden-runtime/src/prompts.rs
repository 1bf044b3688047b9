//! Prompt templates for judge calls.
//!
//! Every provider receives the same system prompt and user-prompt shape,
//! so replies can be normalized uniformly regardless of backend.

use warden_core::Rule;

/// System prompt establishing the judge's output contract.
pub const JUDGE_SYSTEM_PROMPT: &str = "\
You are a strict content policy judge. Evaluate whether the given content \
satisfies the stated criteria.

Respond with ONLY a JSON object, no prose before or after:
{
  \"verdict\": \"PASS\" | \"FAIL\" | \"UNCERTAIN\",
  \"confidence\": <number between 0.0 and 1.0>,
  \"reasoning\": \"<one or two sentences explaining the verdict>\"
}

Use PASS when the content clearly satisfies the criteria, FAIL when it \
clearly violates them, and UNCERTAIN when you cannot decide from the \
content alone.";

/// Judgement criteria for a rule: its description (when present)
/// followed by the judge prompt.
pub fn criteria_for(rule: &Rule) -> String {
    match &rule.description {
        Some(description) if !description.is_empty() => {
            format!("{}\n\n{}", description, rule.judge_prompt)
        }
        _ => rule.judge_prompt.clone(),
    }
}

/// User prompt pairing criteria with the content under judgement.
pub fn user_prompt(criteria: &str, content: &str) -> String {
    format!(
        "Criteria:\n{}\n\nContent to evaluate:\n<content>\n{}\n</content>",
        criteria, content
    )
}
