//! Rubric evaluator: deterministic checks plus an optional qualitative judgment.

use tracing::warn;

use crate::core::rubric::check_rubric;
use crate::core::types::{EvaluationResult, Rubric};
use crate::io::judge::QualitativeJudge;

/// Scores generated text against a task rubric.
///
/// Without a judge, `analysis` stays `None`. A failing judge never fails the
/// evaluation; its error is reported in `analysis` instead.
#[derive(Clone, Copy, Default)]
pub struct Evaluator<'a> {
    judge: Option<&'a dyn QualitativeJudge>,
}

impl<'a> Evaluator<'a> {
    pub fn new(judge: Option<&'a dyn QualitativeJudge>) -> Self {
        Self { judge }
    }

    /// Rubric checks only.
    pub fn rubric_only() -> Self {
        Self { judge: None }
    }

    pub fn evaluate(&self, text: &str, rubric: &Rubric) -> EvaluationResult {
        let check = check_rubric(text, rubric);
        let analysis = self.judge.map(|judge| {
            match judge.judge(text, &rubric.evaluation_instructions) {
                Ok(analysis) => analysis,
                Err(err) => {
                    warn!(error = %err, "qualitative evaluation failed");
                    format!("Error calling judge for qualitative evaluation: {err}")
                }
            }
        });
        EvaluationResult {
            word_count_ok: check.word_count_ok,
            must_include_ok: check.must_include_ok,
            score: check.score(),
            analysis,
        }
    }
}
