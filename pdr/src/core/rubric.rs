//! Deterministic rubric checks.
//!
//! The numeric score is a fixed base plus one bonus per passing check, so the
//! only reachable values are 50, 75 and 100. A word-count miss and a keyword
//! miss both land on 75.

use crate::core::types::Rubric;

pub const BASE_SCORE: u32 = 50;
pub const WORD_COUNT_BONUS: u32 = 25;
pub const MUST_INCLUDE_BONUS: u32 = 25;

/// Pass/fail outcome of the deterministic checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RubricCheck {
    pub word_count: usize,
    pub word_count_ok: bool,
    pub must_include_ok: bool,
}

impl RubricCheck {
    pub fn score(&self) -> u32 {
        let mut score = BASE_SCORE;
        if self.word_count_ok {
            score += WORD_COUNT_BONUS;
        }
        if self.must_include_ok {
            score += MUST_INCLUDE_BONUS;
        }
        score
    }
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// True when every required substring appears, ignoring case.
pub fn contains_all(text: &str, required: &[String]) -> bool {
    let haystack = text.to_lowercase();
    required
        .iter()
        .all(|needle| haystack.contains(&needle.to_lowercase()))
}

pub fn check_rubric(text: &str, rubric: &Rubric) -> RubricCheck {
    let (min, max) = rubric.word_count_range;
    let count = word_count(text);
    RubricCheck {
        word_count: count,
        word_count_ok: (min..=max).contains(&count),
        must_include_ok: contains_all(text, &rubric.must_include),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric(min: usize, max: usize, must: &[&str]) -> Rubric {
        Rubric {
            word_count_range: (min, max),
            must_include: must.iter().map(|s| s.to_string()).collect(),
            evaluation_instructions: String::new(),
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn word_count_bounds_are_inclusive() {
        let r = rubric(3, 5, &[]);
        assert!(!check_rubric(&words(2), &r).word_count_ok);
        assert!(check_rubric(&words(3), &r).word_count_ok);
        assert!(check_rubric(&words(5), &r).word_count_ok);
        assert!(!check_rubric(&words(6), &r).word_count_ok);
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        assert_eq!(word_count("  one\ttwo\n\nthree  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn must_include_ignores_case() {
        let r = rubric(0, 100, &["Moral Dilemma", "dialogue"]);
        assert!(check_rubric("a MORAL dilemma with DIALOGUE", &r).must_include_ok);
        assert!(!check_rubric("a moral dilemma only", &r).must_include_ok);
    }

    #[test]
    fn empty_must_include_always_passes() {
        assert!(check_rubric("", &rubric(0, 0, &[])).must_include_ok);
    }

    #[test]
    fn scores_cover_all_four_combinations() {
        let r = rubric(2, 3, &["alpha"]);
        assert_eq!(check_rubric("alpha beta", &r).score(), 100);
        assert_eq!(check_rubric("beta gamma", &r).score(), 75);
        assert_eq!(check_rubric("alpha", &r).score(), 75);
        assert_eq!(check_rubric("beta", &r).score(), 50);
    }
}
