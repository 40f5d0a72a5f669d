//! Refinement strategies.
//!
//! Each strategy runs one bounded generate/evaluate/refine loop for a
//! (persona, task) pair and returns a [`RunResult`]. Terminal collaborator
//! failures propagate as errors carrying a
//! [`CollaboratorError`](crate::io::error::CollaboratorError).

pub mod adhoc;
pub mod critic;
pub mod pdr;

use std::time::Instant;

use anyhow::Result;

use crate::core::satisfaction::satisfaction;
use crate::core::types::{EvaluationResult, Persona, RunResult, StrategyKind, Task};

pub use adhoc::AdHocStrategy;
pub use critic::CriticPreferences;
pub use pdr::{EvaluatorPreferences, PdrStrategy, PreferenceStage};

pub trait Strategy {
    fn kind(&self) -> StrategyKind;

    /// Model recorded in results.
    fn model(&self) -> &str;

    fn simulate(&self, persona: &Persona, task: &Task) -> Result<RunResult>;
}

/// One generated output and its evaluation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub output: String,
    pub eval: EvaluationResult,
}

/// Loop state carried to the final [`RunResult`].
pub(crate) struct Progress {
    started: Instant,
    pub iterations: u32,
    pub last: Option<Candidate>,
}

impl Progress {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            iterations: 0,
            last: None,
        }
    }

    pub fn finish(self, strategy: &dyn Strategy, persona: &Persona, task: &Task) -> RunResult {
        let time_spent_sec = self.started.elapsed().as_secs_f64();
        let (final_output, final_score) = self
            .last
            .map(|c| (c.output, c.eval.score))
            .unwrap_or_default();
        RunResult {
            participant_name: persona.name.clone(),
            task_name: task.name.clone(),
            strategy: strategy.kind(),
            model: strategy.model().to_string(),
            iteration_count: self.iterations,
            time_spent_sec,
            final_score,
            final_output,
            satisfaction_score: satisfaction(final_score),
            expert: None,
            final_critic_report: None,
        }
    }
}
