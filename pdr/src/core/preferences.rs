//! Prompt feedback and preference extraction.
//!
//! Every refinement appends a block to the running prompt; nothing already in
//! the prompt is ever rewritten.

use crate::core::types::EvaluationResult;

pub const ADHOC_ANALYSIS_EXCERPT: usize = 300;
pub const PDR_ANALYSIS_EXCERPT: usize = 200;
pub const CRITIC_SUMMARY_EXCERPT: usize = 300;

/// Truncate to `limit` characters, marking truncation with `...`.
pub fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn adhoc_initial_prompt(target_spec: &str) -> String {
    format!("Your task:\n{target_spec}\n\nPlease produce your best final output.")
}

pub fn pdr_initial_prompt(target_spec: &str) -> String {
    format!(
        "Your task:\n{target_spec}\n\nGenerate multiple distinct outputs.\nWe'll pick the best and refine from there."
    )
}

pub fn critic_initial_prompt(target_spec: &str) -> String {
    format!(
        "Your task:\n{target_spec}\n\nGenerate multiple distinct outputs.\nWe'll pick the best, but also have a 'critic' assess each output.\n"
    )
}

/// Per-candidate request derived from the shared prompt. `index` is 1-based.
pub fn candidate_request(prompt: &str, index: u32) -> String {
    format!("{prompt}\n\n(Version #{index})")
}

/// Feedback lines for the ad hoc loop.
pub fn adhoc_feedback(eval: &EvaluationResult) -> String {
    let mut lines = Vec::new();
    if !eval.word_count_ok {
        lines.push("Word count is out of the specified range.".to_string());
    }
    if !eval.must_include_ok {
        lines.push("You missed one or more required keywords or phrases.".to_string());
    }
    if let Some(analysis) = &eval.analysis {
        lines.push(format!(
            "Analysis says: {}",
            excerpt(analysis, ADHOC_ANALYSIS_EXCERPT)
        ));
    }
    lines.join("\n")
}

pub fn adhoc_block(feedback: &str) -> String {
    format!(
        "\n\n[AD HOC FEEDBACK] Please refine the output based on:\n{feedback}\nTry again and improve your answer."
    )
}

/// Preference lines derived from the best candidate's evaluation.
pub fn pdr_preferences(best: &EvaluationResult) -> String {
    let mut lines = Vec::new();
    if best.word_count_ok {
        lines.push(
            "Preferred: The word count is within the specified range. Keep that length/style."
                .to_string(),
        );
    } else {
        lines.push(
            "Non-preferred: The word count is out of the specified range. Adjust accordingly."
                .to_string(),
        );
    }
    if !best.must_include_ok {
        lines.push(
            "Non-preferred: Missing required keywords or phrases. Add them in next version."
                .to_string(),
        );
    }
    if let Some(analysis) = &best.analysis {
        lines.push(format!(
            "Analysis (excerpt): {}",
            excerpt(analysis, PDR_ANALYSIS_EXCERPT)
        ));
    }
    lines.join("\n")
}

/// Preference lines combining the best candidate's checks with a critic report.
pub fn critic_preferences(best: &EvaluationResult, report: Option<&str>) -> String {
    let mut lines = Vec::new();
    if best.word_count_ok {
        lines.push("Preferred: Word count is within range.".to_string());
    } else {
        lines.push("Non-preferred: Word count out of range.".to_string());
    }
    if !best.must_include_ok {
        lines.push("Non-preferred: Missing required keywords.".to_string());
    }
    if let Some(report) = report {
        lines.push(format!(
            "Critic Summary (excerpt): {}",
            excerpt(report, CRITIC_SUMMARY_EXCERPT)
        ));
    }
    lines.join("\n")
}

/// Wrap preference lines in a tagged refinement block.
pub fn preference_block(header: &str, preferences: &str, footer: &str) -> String {
    format!("\n\n{header}\n{preferences}\n{footer}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(word_count_ok: bool, must_include_ok: bool, analysis: Option<&str>) -> EvaluationResult {
        EvaluationResult {
            word_count_ok,
            must_include_ok,
            score: 50,
            analysis: analysis.map(str::to_string),
        }
    }

    #[test]
    fn excerpt_marks_truncation_only_when_longer() {
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("abc", 3), "abc");
        assert_eq!(excerpt("héllo", 2), "hé...");
    }

    #[test]
    fn adhoc_feedback_lists_failures_then_analysis() {
        let feedback = adhoc_feedback(&eval(false, false, Some("too short")));
        assert_eq!(
            feedback,
            "Word count is out of the specified range.\n\
             You missed one or more required keywords or phrases.\n\
             Analysis says: too short"
        );
    }

    #[test]
    fn adhoc_block_wraps_feedback() {
        assert_eq!(
            adhoc_block("x"),
            "\n\n[AD HOC FEEDBACK] Please refine the output based on:\nx\nTry again and improve your answer."
        );
    }

    #[test]
    fn pdr_preferences_keep_length_when_in_range() {
        let prefs = pdr_preferences(&eval(true, false, None));
        assert!(prefs.starts_with("Preferred: The word count is within the specified range."));
        assert!(prefs.contains("Missing required keywords or phrases"));
    }

    #[test]
    fn pdr_preferences_truncate_analysis() {
        let long = "a".repeat(250);
        let prefs = pdr_preferences(&eval(false, true, Some(&long)));
        let last = prefs.lines().last().expect("analysis line");
        assert_eq!(last, format!("Analysis (excerpt): {}...", "a".repeat(200)));
    }

    #[test]
    fn critic_preferences_include_report_excerpt() {
        let prefs = critic_preferences(&eval(true, true, None), Some("Output #1 is better."));
        assert_eq!(
            prefs,
            "Preferred: Word count is within range.\nCritic Summary (excerpt): Output #1 is better."
        );
    }

    #[test]
    fn candidate_request_is_numbered() {
        assert_eq!(candidate_request("p", 2), "p\n\n(Version #2)");
    }
}
