//! Critic-augmented refinement signal for the PDR loop.

use crate::core::preferences::{critic_initial_prompt, critic_preferences};
use crate::core::types::{EvaluationResult, StrategyKind};
use crate::io::critic::{CRITIC_INSTRUCTIONS, Critic};
use crate::io::error::CollaboratorError;
use crate::strategy::pdr::PreferenceStage;

/// Runs the critic over every batch, including the one that terminates the
/// loop, and folds an excerpt of its report into the preferences.
pub struct CriticPreferences<'a> {
    critic: &'a dyn Critic,
}

impl<'a> CriticPreferences<'a> {
    pub fn new(critic: &'a dyn Critic) -> Self {
        Self { critic }
    }
}

impl PreferenceStage for CriticPreferences<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PdrCritic
    }

    fn opening(&self, target_spec: &str) -> String {
        critic_initial_prompt(target_spec)
    }

    fn review(&self, outputs: &[String]) -> Result<Option<String>, CollaboratorError> {
        self.critic.critique(outputs, CRITIC_INSTRUCTIONS).map(Some)
    }

    fn preferences(&self, best: &EvaluationResult, review: Option<&str>) -> String {
        critic_preferences(best, review)
    }

    fn block_header(&self) -> &'static str {
        "[PDR WITH CRITIC REFINEMENT]"
    }

    fn block_footer(&self) -> &'static str {
        "Based on these preferences and critic's feedback, please refine future outputs."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RefinementSettings;
    use crate::evaluator::Evaluator;
    use crate::strategy::{PdrStrategy, Strategy};
    use crate::test_support::{ScriptedCritic, ScriptedGenerator, persona, words_task};

    #[test]
    fn critic_excerpt_lands_in_next_prompt() {
        let generator = ScriptedGenerator::repeating("beta");
        let critic = ScriptedCritic::answering("Output #1 is too short.");
        let settings = RefinementSettings {
            max_iterations: 2,
            num_outputs_per_iter: 2,
            ..RefinementSettings::default()
        };
        let strategy =
            PdrStrategy::new(&generator, Evaluator::rubric_only(), &settings).with_critic(&critic);
        let result = strategy
            .simulate(&persona("P"), &words_task(2, 3, &["alpha"]))
            .expect("simulate");

        assert_eq!(result.strategy, StrategyKind::PdrCritic);
        assert_eq!(result.final_critic_report.as_deref(), Some("Output #1 is too short."));
        let prompts = generator.prompts();
        assert!(prompts[0].contains("have a 'critic' assess each output."));
        assert!(prompts[2].contains(
            "[PDR WITH CRITIC REFINEMENT]\nNon-preferred: Word count out of range.\n\
             Non-preferred: Missing required keywords.\n\
             Critic Summary (excerpt): Output #1 is too short.\n\
             Based on these preferences and critic's feedback, please refine future outputs."
        ));
        assert_eq!(critic.batches()[0], vec!["beta".to_string(), "beta".to_string()]);
    }
}
