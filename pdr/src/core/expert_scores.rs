//! Parsing of expert-review replies.
//!
//! The reviewer is asked for compact JSON, but replies drift: fenced JSON,
//! prose with `correctness: 4/5`, or nothing usable at all.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::types::ExpertEvaluation;

pub const MAX_SCORE: f64 = 5.0;

static FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[a-zA-Z0-9_+-]*\n").unwrap());
static FENCE_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n```$").unwrap());

static CORRECTNESS_STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)correctness\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(?:/|out of)?\s*5").unwrap()
});
static CORRECTNESS_LOOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)correctness\s*[:=]?\s*(\d+(?:\.\d+)?)").unwrap());
static STYLE_STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:style|clarity)\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(?:/|out of)?\s*5").unwrap()
});
static STYLE_LOOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:style|clarity)\s*[:=]?\s*(\d+(?:\.\d+)?)").unwrap());

pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_SCORE)
}

fn strip_fences(raw: &str) -> String {
    if !raw.starts_with("```") {
        return raw.to_string();
    }
    let inner = FENCE_OPEN_RE.replace(raw, "");
    FENCE_CLOSE_RE.replace(&inner, "").into_owned()
}

fn json_score(obj: &Value, key: &str) -> f64 {
    let value = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_score(value)
}

/// Parse a JSON reply `{correctness_score, style_score, notes}`.
///
/// Missing or non-numeric scores count as zero; a reply that is not a JSON
/// object yields `None`.
pub fn parse_json_scores(raw: &str) -> Option<ExpertEvaluation> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let body = strip_fences(raw);
    let obj: Value = serde_json::from_str(&body).ok()?;
    if !obj.is_object() {
        return None;
    }
    let notes = match obj.get("notes") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    Some(ExpertEvaluation {
        correctness_score: Some(json_score(&obj, "correctness_score")),
        style_score: Some(json_score(&obj, "style_score")),
        notes,
    })
}

fn find_score(text: &str, strict: &Regex, loose: &Regex) -> Option<f64> {
    strict
        .captures(text)
        .or_else(|| loose.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(clamp_score)
}

/// Pull scores out of free-form prose. Both scores must be found.
pub fn fallback_scores(text: &str) -> Option<ExpertEvaluation> {
    let correctness = find_score(text, &CORRECTNESS_STRICT_RE, &CORRECTNESS_LOOSE_RE)?;
    let style = find_score(text, &STYLE_STRICT_RE, &STYLE_LOOSE_RE)?;
    Some(ExpertEvaluation {
        correctness_score: Some(correctness),
        style_score: Some(style),
        notes: text.trim().to_string(),
    })
}

/// JSON first, then prose.
pub fn parse_expert_reply(raw: &str) -> Option<ExpertEvaluation> {
    parse_json_scores(raw).or_else(|| fallback_scores(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let eval = parse_json_scores(r#"{"correctness_score": 4.5, "style_score": 3, "notes": " tidy "}"#)
            .expect("json");
        assert_eq!(eval.correctness_score, Some(4.5));
        assert_eq!(eval.style_score, Some(3.0));
        assert_eq!(eval.notes, "tidy");
    }

    #[test]
    fn strips_code_fences() {
        let raw = "```json\n{\"correctness_score\": 2, \"style_score\": 1, \"notes\": \"\"}\n```";
        let eval = parse_json_scores(raw).expect("fenced json");
        assert_eq!(eval.correctness_score, Some(2.0));
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let eval = parse_json_scores(r#"{"correctness_score": 9, "style_score": -1}"#).expect("json");
        assert_eq!(eval.correctness_score, Some(5.0));
        assert_eq!(eval.style_score, Some(0.0));
    }

    #[test]
    fn prose_fallback_reads_common_phrasings() {
        let eval = parse_expert_reply("Correctness: 4.5/5. Style 3 out of 5, overall decent.")
            .expect("fallback");
        assert_eq!(eval.correctness_score, Some(4.5));
        assert_eq!(eval.style_score, Some(3.0));
        assert!(eval.notes.starts_with("Correctness"));
    }

    #[test]
    fn clarity_counts_as_style() {
        let eval = fallback_scores("correctness = 3\nclarity: 2").expect("fallback");
        assert_eq!(eval.style_score, Some(2.0));
    }

    #[test]
    fn missing_style_is_unparsable() {
        assert_eq!(parse_expert_reply("correctness 4/5 and nothing else"), None);
        assert_eq!(parse_expert_reply("   "), None);
    }
}
