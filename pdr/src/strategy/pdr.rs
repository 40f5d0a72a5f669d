//! Multi-candidate preference-driven refinement.
//!
//! Each iteration samples `num_outputs_per_iter` candidates from the same
//! prompt, keeps the best-scoring one, and appends a preference block derived
//! from it. The refinement signal is pluggable ([`PreferenceStage`]) so the
//! critic variant reuses this loop unchanged.

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument};

use crate::core::preferences::{
    candidate_request, pdr_initial_prompt, pdr_preferences, preference_block,
};
use crate::core::selector::best_index;
use crate::core::types::{
    EvaluationResult, Persona, RefinementSettings, RunResult, StrategyKind, Task,
};
use crate::evaluator::Evaluator;
use crate::io::critic::Critic;
use crate::io::error::CollaboratorError;
use crate::io::generator::Generator;
use crate::strategy::critic::CriticPreferences;
use crate::strategy::{Candidate, Progress, Strategy};

/// Source of the preference block appended between iterations.
pub trait PreferenceStage {
    fn kind(&self) -> StrategyKind;

    fn opening(&self, target_spec: &str) -> String;

    /// Extra signal over the whole batch, gathered every iteration.
    fn review(&self, outputs: &[String]) -> Result<Option<String>, CollaboratorError>;

    fn preferences(&self, best: &EvaluationResult, review: Option<&str>) -> String;

    fn block_header(&self) -> &'static str;

    fn block_footer(&self) -> &'static str;
}

/// Preferences taken from the best candidate's evaluation alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluatorPreferences;

impl PreferenceStage for EvaluatorPreferences {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pdr
    }

    fn opening(&self, target_spec: &str) -> String {
        pdr_initial_prompt(target_spec)
    }

    fn review(&self, _outputs: &[String]) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }

    fn preferences(&self, best: &EvaluationResult, _review: Option<&str>) -> String {
        pdr_preferences(best)
    }

    fn block_header(&self) -> &'static str {
        "[PDR REFINEMENT]"
    }

    fn block_footer(&self) -> &'static str {
        "Based on these preferences, please refine future outputs."
    }
}

pub struct PdrStrategy<'a, S = EvaluatorPreferences> {
    generator: &'a dyn Generator,
    evaluator: Evaluator<'a>,
    settings: &'a RefinementSettings,
    stage: S,
}

impl<'a> PdrStrategy<'a, EvaluatorPreferences> {
    pub fn new(
        generator: &'a dyn Generator,
        evaluator: Evaluator<'a>,
        settings: &'a RefinementSettings,
    ) -> Self {
        Self {
            generator,
            evaluator,
            settings,
            stage: EvaluatorPreferences,
        }
    }

    /// Same loop, refined by a critic report over every batch.
    pub fn with_critic(self, critic: &'a dyn Critic) -> PdrStrategy<'a, CriticPreferences<'a>> {
        PdrStrategy {
            generator: self.generator,
            evaluator: self.evaluator,
            settings: self.settings,
            stage: CriticPreferences::new(critic),
        }
    }
}

impl<S: PreferenceStage> PdrStrategy<'_, S> {
    fn generate_batch(&self, persona: &Persona, prompt: &str, iteration: u32) -> Result<Vec<String>> {
        (1..=self.settings.num_outputs_per_iter)
            .map(|version| {
                self.generator
                    .generate(
                        persona,
                        &candidate_request(prompt, version),
                        self.settings.candidate_temperature,
                    )
                    .with_context(|| format!("iteration {iteration}, candidate {version}"))
            })
            .collect()
    }
}

impl<S: PreferenceStage> Strategy for PdrStrategy<'_, S> {
    fn kind(&self) -> StrategyKind {
        self.stage.kind()
    }

    fn model(&self) -> &str {
        self.generator.model()
    }

    #[instrument(skip_all, fields(strategy = %self.stage.kind(), persona = %persona.name, task = %task.name))]
    fn simulate(&self, persona: &Persona, task: &Task) -> Result<RunResult> {
        let mut progress = Progress::start();
        let mut prompt = self.stage.opening(&task.target_spec);
        let mut last_review = None;

        for iteration in 1..=self.settings.max_iterations {
            progress.iterations = iteration;
            let outputs = self.generate_batch(persona, &prompt, iteration)?;
            let mut candidates: Vec<Candidate> = outputs
                .iter()
                .map(|output| Candidate {
                    output: output.clone(),
                    eval: self.evaluator.evaluate(output, &task.rubric),
                })
                .collect();
            let best = best_index(&candidates, |c| c.eval.score)
                .ok_or_else(|| anyhow!("iteration {iteration} produced no candidates"))?;
            let best = candidates.swap_remove(best);

            let review = self
                .stage
                .review(&outputs)
                .with_context(|| format!("iteration {iteration} review"))?;
            debug!(
                iteration,
                best_score = best.eval.score,
                reviewed = review.is_some(),
                "pdr iteration"
            );

            let done = best.eval.score >= self.settings.score_threshold;
            if !done {
                let prefs = self.stage.preferences(&best.eval, review.as_deref());
                prompt.push_str(&preference_block(
                    self.stage.block_header(),
                    &prefs,
                    self.stage.block_footer(),
                ));
            }
            progress.last = Some(best);
            last_review = review;
            if done {
                break;
            }
        }

        let mut result = progress.finish(self, persona, task);
        result.final_critic_report = last_review;
        info!(
            iterations = result.iteration_count,
            score = result.final_score,
            "pdr run finished"
        );
        Ok(result)
    }
}
