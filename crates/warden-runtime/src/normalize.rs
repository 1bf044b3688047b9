//! Judge reply normalization.
//!
//! Models are told to reply with a JSON object but do not always comply:
//! markdown fences, prose around the JSON, bare verdict words, and
//! confidences on a 0-100 scale all appear in practice. Normalization
//! absorbs every shape into a [`JudgeResult`] without ever failing.

use serde_json::Value as JsonValue;
use warden_core::{normalize_confidence, JudgeResult, Verdict};

/// Parse a raw judge reply body into a structured result.
///
/// Malformed replies never error: the fallback scans the raw text for a
/// verdict token and reports half confidence.
pub fn normalize_reply(body: &str) -> JudgeResult {
    let stripped = strip_fences(body);

    if let Ok(json) = serde_json::from_str::<JsonValue>(stripped) {
        if let Some(result) = from_json(&json, body) {
            return result;
        }
    }

    scan_raw(body)
}

/// Remove markdown code fences around a JSON payload.
fn strip_fences(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

fn from_json(json: &JsonValue, raw: &str) -> Option<JudgeResult> {
    let token = json.get("verdict")?.as_str()?;
    let verdict = parse_verdict(token);

    let confidence = json.get("confidence").and_then(|value| {
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse::<f64>().ok()))
    });

    let reasoning = json
        .get("reasoning")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string());

    Some(JudgeResult::new(
        verdict,
        normalize_confidence(confidence),
        reasoning,
    ))
}

/// Map a verdict token, including common model synonyms.
fn parse_verdict(token: &str) -> Verdict {
    match token.trim().to_uppercase().as_str() {
        "PASS" | "PASSED" | "CLEAN" | "SAFE" => Verdict::Pass,
        "FAIL" | "FAILED" | "VIOLATION" | "UNSAFE" | "BLOCKED" | "BLOCK" => Verdict::Fail,
        _ => Verdict::Uncertain,
    }
}

/// Last resort: scan the raw text for the first verdict word.
fn scan_raw(body: &str) -> JudgeResult {
    let upper = body.to_uppercase();
    let pass = upper.find("PASS");
    let fail = upper.find("FAIL");

    let verdict = match (pass, fail) {
        (Some(p), Some(f)) if p < f => Verdict::Pass,
        (Some(_), Some(_)) => Verdict::Fail,
        (Some(_), None) => Verdict::Pass,
        (None, Some(_)) => Verdict::Fail,
        (None, None) => Verdict::Uncertain,
    };

    JudgeResult::new(verdict, 0.5, body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_json_reply() {
        let result = normalize_reply(
            r#"{"verdict": "PASS", "confidence": 0.9, "reasoning": "no issues found"}"#,
        );
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.reasoning, "no issues found");
        assert!(result.error.is_none());
    }

    #[test]
    fn markdown_fenced_json() {
        let result = normalize_reply(
            "```json\n{\"verdict\": \"FAIL\", \"confidence\": 0.8, \"reasoning\": \"violation\"}\n```",
        );
        assert_eq!(result.verdict, Verdict::Fail);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn verdict_synonyms_map() {
        for token in ["PASSED", "CLEAN", "SAFE", "pass"] {
            let body = format!(r#"{{"verdict": "{}", "confidence": 1.0}}"#, token);
            assert_eq!(normalize_reply(&body).verdict, Verdict::Pass, "{}", token);
        }
        for token in ["FAILED", "VIOLATION", "UNSAFE", "BLOCKED"] {
            let body = format!(r#"{{"verdict": "{}", "confidence": 1.0}}"#, token);
            assert_eq!(normalize_reply(&body).verdict, Verdict::Fail, "{}", token);
        }
        let body = r#"{"verdict": "MAYBE", "confidence": 1.0}"#;
        assert_eq!(normalize_reply(body).verdict, Verdict::Uncertain);
    }

    #[test]
    fn percent_scale_confidence_is_normalized() {
        let result = normalize_reply(r#"{"verdict": "PASS", "confidence": 85}"#);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn string_confidence_is_parsed() {
        let result = normalize_reply(r#"{"verdict": "PASS", "confidence": "0.75"}"#);
        assert_eq!(result.confidence, 0.75);
    }

    #[test]
    fn missing_confidence_defaults_to_half() {
        let result = normalize_reply(r#"{"verdict": "FAIL", "reasoning": "bad"}"#);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn missing_reasoning_keeps_raw_body() {
        let body = r#"{"verdict": "PASS", "confidence": 0.9}"#;
        let result = normalize_reply(body);
        assert_eq!(result.reasoning, body);
    }

    #[test]
    fn non_json_reply_scans_for_verdict() {
        let result = normalize_reply("The content PASSes every check.");
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.confidence, 0.5);

        let result = normalize_reply("This is a clear FAIL, no question.");
        assert_eq!(result.verdict, Verdict::Fail);
    }

    #[test]
    fn earlier_token_wins_in_raw_scan() {
        let result = normalize_reply("FAIL. It does not pass.");
        assert_eq!(result.verdict, Verdict::Fail);
    }

    #[test]
    fn gibberish_is_uncertain() {
        let result = normalize_reply("lorem ipsum dolor");
        assert_eq!(result.verdict, Verdict::Uncertain);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn json_without_verdict_falls_back_to_scan() {
        let result = normalize_reply(r#"{"confidence": 0.9, "note": "it passes"}"#);
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.confidence, 0.5);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_bodies_normalize_into_the_unit_interval(body in ".{0,256}") {
                let result = normalize_reply(&body);
                prop_assert!((0.0..=1.0).contains(&result.confidence));
            }

            #[test]
            fn any_finite_confidence_is_clamped(confidence in -1e6f64..1e6f64) {
                let body = format!(r#"{{"verdict": "PASS", "confidence": {}}}"#, confidence);
                let result = normalize_reply(&body);
                prop_assert_eq!(result.verdict, Verdict::Pass);
                prop_assert!((0.0..=1.0).contains(&result.confidence));
            }
        }
    }
}
