//! Experiment driver: one strategy over every (persona, task) pair.

use anyhow::Result;
use tracing::{instrument, warn};

use crate::core::types::{Persona, RunResult, Task};
use crate::io::config::ErrorPolicy;
use crate::io::error::CollaboratorError;
use crate::io::manifest::RunFailure;
use crate::strategy::Strategy;

/// Reason why `run_experiment` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverStop {
    /// Every pair was attempted.
    Finished,
    /// A terminal collaborator failure under [`ErrorPolicy::Halt`].
    Halted,
}

/// Summary of a driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOutcome {
    pub completed: u32,
    /// Aborted runs, in order. Under `Halt` the last entry is the one that stopped the driver.
    pub failures: Vec<RunFailure>,
    pub stop: DriverStop,
}

/// Per-pair notification handed to the caller as runs finish.
#[derive(Debug)]
pub enum RunEvent<'a> {
    Completed(&'a RunResult),
    Failed(&'a RunFailure),
}

/// Run `strategy` for every persona (outer) and task (inner).
///
/// Runs aborted by a [`CollaboratorError`] are skipped or halt the driver
/// according to `policy`. Any other error, including one returned by
/// `on_event`, stops immediately.
#[instrument(skip_all, fields(strategy = %strategy.kind(), personas = personas.len(), tasks = tasks.len()))]
pub fn run_experiment<F: FnMut(RunEvent<'_>) -> Result<()>>(
    strategy: &dyn Strategy,
    personas: &[Persona],
    tasks: &[Task],
    policy: ErrorPolicy,
    mut on_event: F,
) -> Result<DriverOutcome> {
    let mut completed = 0u32;
    let mut failures = Vec::new();

    for persona in personas {
        for task in tasks {
            match strategy.simulate(persona, task) {
                Ok(result) => {
                    completed += 1;
                    on_event(RunEvent::Completed(&result))?;
                }
                Err(err) => {
                    if err.downcast_ref::<CollaboratorError>().is_none() {
                        return Err(err);
                    }
                    warn!(
                        persona = %persona.name,
                        task = %task.name,
                        error = %format!("{err:#}"),
                        "run aborted"
                    );
                    let failure = RunFailure {
                        participant_name: persona.name.clone(),
                        task_name: task.name.clone(),
                        error: format!("{err:#}"),
                    };
                    on_event(RunEvent::Failed(&failure))?;
                    failures.push(failure);
                    if policy == ErrorPolicy::Halt {
                        return Ok(DriverOutcome {
                            completed,
                            failures,
                            stop: DriverStop::Halted,
                        });
                    }
                }
            }
        }
    }

    Ok(DriverOutcome {
        completed,
        failures,
        stop: DriverStop::Finished,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RefinementSettings;
    use crate::evaluator::Evaluator;
    use crate::strategy::AdHocStrategy;
    use crate::test_support::{ScriptedGenerator, persona, words_task};

    #[test]
    fn visits_personas_outer_and_tasks_inner() {
        let generator = ScriptedGenerator::repeating("alpha beta");
        let settings = RefinementSettings::default();
        let strategy = AdHocStrategy::new(&generator, Evaluator::rubric_only(), &settings);
        let mut t1 = words_task(2, 3, &[]);
        t1.name = "T1".to_string();
        let mut t2 = t1.clone();
        t2.name = "T2".to_string();

        let mut seen = Vec::new();
        let outcome = run_experiment(
            &strategy,
            &[persona("A"), persona("B")],
            &[t1, t2],
            ErrorPolicy::Skip,
            |event| {
                if let RunEvent::Completed(r) = event {
                    seen.push(format!("{}/{}", r.participant_name, r.task_name));
                }
                Ok(())
            },
        )
        .expect("run");
        assert_eq!(outcome.completed, 4);
        assert_eq!(outcome.stop, DriverStop::Finished);
        assert_eq!(seen, ["A/T1", "A/T2", "B/T1", "B/T2"]);
    }

    #[test]
    fn callback_errors_stop_the_driver() {
        let generator = ScriptedGenerator::repeating("alpha beta");
        let settings = RefinementSettings::default();
        let strategy = AdHocStrategy::new(&generator, Evaluator::rubric_only(), &settings);
        let err = run_experiment(
            &strategy,
            &[persona("A")],
            &[words_task(2, 3, &[])],
            ErrorPolicy::Skip,
            |_| Err(anyhow::anyhow!("disk full")),
        )
        .expect_err("persistence failure");
        assert!(err.to_string().contains("disk full"));
    }
}
