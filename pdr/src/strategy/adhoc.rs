//! Single-candidate retry loop with rubric feedback.

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::preferences::{adhoc_block, adhoc_feedback, adhoc_initial_prompt};
use crate::core::types::{Persona, RefinementSettings, RunResult, StrategyKind, Task};
use crate::evaluator::Evaluator;
use crate::io::expert::ExpertReviewer;
use crate::io::generator::Generator;
use crate::strategy::{Candidate, Progress, Strategy};

pub struct AdHocStrategy<'a> {
    generator: &'a dyn Generator,
    evaluator: Evaluator<'a>,
    settings: &'a RefinementSettings,
    expert: Option<&'a dyn ExpertReviewer>,
}

impl<'a> AdHocStrategy<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        evaluator: Evaluator<'a>,
        settings: &'a RefinementSettings,
    ) -> Self {
        Self {
            generator,
            evaluator,
            settings,
            expert: None,
        }
    }

    /// Review the final output once the loop ends.
    pub fn with_expert(mut self, expert: &'a dyn ExpertReviewer) -> Self {
        self.expert = Some(expert);
        self
    }
}

impl Strategy for AdHocStrategy<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AdHoc
    }

    fn model(&self) -> &str {
        self.generator.model()
    }

    #[instrument(skip_all, fields(persona = %persona.name, task = %task.name))]
    fn simulate(&self, persona: &Persona, task: &Task) -> Result<RunResult> {
        let mut progress = Progress::start();
        let mut prompt = adhoc_initial_prompt(&task.target_spec);

        for iteration in 1..=self.settings.max_iterations {
            progress.iterations = iteration;
            let output = self
                .generator
                .generate(persona, &prompt, self.settings.candidate_temperature)
                .with_context(|| format!("ad hoc iteration {iteration}"))?;
            let eval = self.evaluator.evaluate(&output, &task.rubric);
            debug!(iteration, score = eval.score, "ad hoc iteration");

            let done = eval.score >= self.settings.score_threshold;
            if !done {
                prompt.push_str(&adhoc_block(&adhoc_feedback(&eval)));
            }
            progress.last = Some(Candidate { output, eval });
            if done {
                break;
            }
        }

        let mut result = progress.finish(self, persona, task);
        if let Some(expert) = self.expert {
            result.expert = Some(expert.review(&result.final_output, &task.domain));
        }
        info!(
            iterations = result.iteration_count,
            score = result.final_score,
            "ad hoc run finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedExpert, ScriptedGenerator, persona, words_task};

    #[test]
    fn stops_once_threshold_is_met() {
        let generator = ScriptedGenerator::new(["alpha beta", "never used"]);
        let settings = RefinementSettings::default();
        let strategy = AdHocStrategy::new(&generator, Evaluator::rubric_only(), &settings);

        let result = strategy
            .simulate(&persona("Participant_A"), &words_task(2, 3, &["alpha"]))
            .expect("simulate");
        assert_eq!(result.iteration_count, 1);
        assert_eq!(result.final_score, 100);
        assert_eq!(result.final_output, "alpha beta");
        assert_eq!(result.satisfaction_score, 5.0);
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn expert_reviews_final_output_with_task_domain() {
        let generator = ScriptedGenerator::repeating("alpha beta");
        let expert = ScriptedExpert::scoring(4.0, 3.0);
        let settings = RefinementSettings::default();
        let strategy =
            AdHocStrategy::new(&generator, Evaluator::rubric_only(), &settings).with_expert(&expert);

        let mut task = words_task(2, 3, &[]);
        task.domain = "business".to_string();
        let result = strategy.simulate(&persona("P"), &task).expect("simulate");
        let review = result.expert.expect("expert fields");
        assert_eq!(review.correctness_score, Some(4.0));
        assert_eq!(expert.seen(), vec![("alpha beta".to_string(), "business".to_string())]);
    }
}
