//! Scoring Service — one LLM call behind a fixed evaluation prompt, parsed
//! into a `ScoreResult`.
//!
//! Policy: scoring fails SOFT. A backend failure, unparsable response, or
//! out-of-range score yields a degraded zero-score result with a diagnostic
//! tip — it never aborts the pipeline run. Callers that need to distinguish
//! "model said zero" from "we couldn't tell" check the `degraded` flag (or
//! the `SCORING_DEGRADED_MARKER` prefix in the tips list).

pub mod prompts;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::{strip_json_fences, LlmClient};
use crate::scoring::prompts::{SCORE_PROMPT_TEMPLATE, SCORE_SYSTEM};

/// Upper bound on resume text fed to the scoring prompt, in chars.
pub const RESUME_SCORE_CHAR_LIMIT: usize = 10_000;
/// Upper bound on job description text fed to the scoring prompt, in chars.
/// Smaller than the resume bound: the JD contributes keywords, not substance.
pub const JD_SCORE_CHAR_LIMIT: usize = 5_000;

/// Prefix carried by the diagnostic tip of a degraded result.
pub const SCORING_DEGRADED_MARKER: &str = "[unscored]";

/// Fit score plus improvement hints for one resume/JD pair.
/// Immutable once returned. Serialize-only: the model response is parsed
/// field by field in `parse_score_response`, not through this type.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// Integer in 0–100.
    pub match_score: u32,
    pub tips: Vec<String>,
    pub missing_keywords: Vec<String>,
    /// True when this result stands in for a scoring failure rather than a
    /// genuine model verdict. Degraded results always carry a zero score.
    pub degraded: bool,
}

impl ScoreResult {
    /// The fail-soft stand-in: zero score, one diagnostic tip, degraded flag.
    pub fn degraded(reason: impl std::fmt::Display) -> Self {
        ScoreResult {
            match_score: 0,
            tips: vec![format!("{SCORING_DEGRADED_MARKER} scoring unavailable: {reason}")],
            missing_keywords: Vec::new(),
            degraded: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoreParseError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response lacks a match_score field")]
    MissingScore,

    #[error("match_score is not coercible to an integer: {0}")]
    NotNumeric(String),

    #[error("match_score {0} is outside 0–100")]
    OutOfRange(i64),
}

/// The scoring seam. `LlmScorer` is the production backend; tests plug in
/// stubs to exercise the pipeline's ordering and failure policy.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Scores `candidate_text` against `jd_text`. Infallible by contract:
    /// every failure mode collapses into a degraded `ScoreResult`.
    async fn score(&self, candidate_text: &str, jd_text: &str) -> ScoreResult;
}

/// Production scorer: one LLM call with the fixed evaluation prompt.
pub struct LlmScorer(pub LlmClient);

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, candidate_text: &str, jd_text: &str) -> ScoreResult {
        let prompt = build_score_prompt(candidate_text, jd_text);

        let raw = match self.0.call_text(&prompt, SCORE_SYSTEM).await {
            Ok(text) => text,
            Err(e) => {
                warn!("scoring backend call failed, degrading to zero: {e}");
                return ScoreResult::degraded(format!("backend call failed: {e}"));
            }
        };

        match parse_score_response(&raw) {
            Ok(result) => result,
            Err(e) => {
                warn!("scoring response unparsable, degrading to zero: {e}");
                ScoreResult::degraded(e)
            }
        }
    }
}

/// Fills the scoring prompt template, truncating both inputs to their
/// char bounds first.
pub fn build_score_prompt(candidate_text: &str, jd_text: &str) -> String {
    SCORE_PROMPT_TEMPLATE
        .replace(
            "{resume_text}",
            truncate_chars(candidate_text, RESUME_SCORE_CHAR_LIMIT),
        )
        .replace("{jd_text}", truncate_chars(jd_text, JD_SCORE_CHAR_LIMIT))
}

/// Parses a raw scoring response into a `ScoreResult`.
///
/// Strips code fences first, then requires a JSON object whose
/// `match_score` is coercible to an integer in 0–100. Tips and missing
/// keywords are preserved verbatim and in order; both default to empty.
pub fn parse_score_response(raw: &str) -> Result<ScoreResult, ScoreParseError> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))?;

    let score_value = value.get("match_score").ok_or(ScoreParseError::MissingScore)?;
    let score = coerce_score(score_value)
        .ok_or_else(|| ScoreParseError::NotNumeric(score_value.to_string()))?;

    if !(0..=100).contains(&score) {
        return Err(ScoreParseError::OutOfRange(score));
    }

    Ok(ScoreResult {
        match_score: score as u32,
        tips: string_array(value.get("tips")),
        missing_keywords: string_array(value.get("missing_keywords")),
        degraded: false,
    })
}

/// Coerces a JSON value to an integer score. Accepts integers, whole-number
/// floats, and numeric strings. Anything else is a scoring failure — never
/// clamped or rounded.
fn coerce_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Truncates to at most `max_chars` chars, respecting char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_response_preserves_score_and_lists() {
        let raw = r#"{
            "match_score": 72,
            "missing_keywords": ["Kubernetes", "Go"],
            "tips": ["Add Kubernetes to your skills section", "Quantify achievements", "Mirror the JD title"]
        }"#;

        let result = parse_score_response(raw).unwrap();
        assert_eq!(result.match_score, 72);
        assert!(!result.degraded);
        assert_eq!(result.missing_keywords, vec!["Kubernetes", "Go"]);
        assert_eq!(result.tips.len(), 3);
        assert_eq!(result.tips[0], "Add Kubernetes to your skills section");
    }

    #[test]
    fn test_fenced_response_parses() {
        let raw = "```json\n{\"match_score\": 55, \"tips\": [], \"missing_keywords\": []}\n```";
        let result = parse_score_response(raw).unwrap();
        assert_eq!(result.match_score, 55);
    }

    #[test]
    fn test_string_score_is_coerced() {
        let raw = r#"{"match_score": "85", "tips": []}"#;
        assert_eq!(parse_score_response(raw).unwrap().match_score, 85);
    }

    #[test]
    fn test_whole_float_score_is_coerced() {
        let raw = r#"{"match_score": 85.0, "tips": []}"#;
        assert_eq!(parse_score_response(raw).unwrap().match_score, 85);
    }

    #[test]
    fn test_fractional_score_is_rejected_not_rounded() {
        let raw = r#"{"match_score": 85.4, "tips": []}"#;
        assert!(matches!(
            parse_score_response(raw),
            Err(ScoreParseError::NotNumeric(_))
        ));
    }

    #[test]
    fn test_missing_match_score_is_an_error() {
        let raw = r#"{"tips": ["something"]}"#;
        assert!(matches!(
            parse_score_response(raw),
            Err(ScoreParseError::MissingScore)
        ));
    }

    #[test]
    fn test_out_of_range_score_is_rejected_not_clamped() {
        let raw = r#"{"match_score": 150, "tips": []}"#;
        assert!(matches!(
            parse_score_response(raw),
            Err(ScoreParseError::OutOfRange(150))
        ));

        let raw = r#"{"match_score": -5, "tips": []}"#;
        assert!(matches!(
            parse_score_response(raw),
            Err(ScoreParseError::OutOfRange(-5))
        ));
    }

    #[test]
    fn test_non_json_response_is_an_error() {
        assert!(parse_score_response("Sorry, I can't score this.").is_err());
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let raw = r#"{"match_score": 40}"#;
        let result = parse_score_response(raw).unwrap();
        assert!(result.tips.is_empty());
        assert!(result.missing_keywords.is_empty());
    }

    #[test]
    fn test_degraded_result_shape() {
        let result = ScoreResult::degraded("backend call failed: timeout");
        assert_eq!(result.match_score, 0);
        assert!(result.degraded);
        assert_eq!(result.tips.len(), 1);
        assert!(result.tips[0].starts_with(SCORING_DEGRADED_MARKER));
        assert!(result.missing_keywords.is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // multi-byte chars must not be split
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_score_prompt_truncates_inputs() {
        // 'z' does not occur in the template, so counts isolate the inputs
        let long_resume = "z".repeat(RESUME_SCORE_CHAR_LIMIT + 500);
        let long_jd = "z".repeat(JD_SCORE_CHAR_LIMIT + 500);
        let prompt = build_score_prompt(&long_resume, &long_jd);

        let z_count = prompt.chars().filter(|c| *c == 'z').count();
        assert_eq!(z_count, RESUME_SCORE_CHAR_LIMIT + JD_SCORE_CHAR_LIMIT);
        assert!(!prompt.contains("{resume_text}"));
        assert!(!prompt.contains("{jd_text}"));
    }
}
