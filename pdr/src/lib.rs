//! Preference-driven refinement simulator.
//!
//! Synthetic participants (LLM personas) work through writing and engineering
//! tasks while a refinement strategy rewrites their prompt between iterations.
//! The crate keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (rubric checks, scoring,
//!   preference extraction, candidate selection). No I/O.
//! - **[`io`]**: Side-effecting collaborators (chat completions, retries,
//!   catalogs, config, CSV persistence). Behind traits so tests can script them.
//!
//! Orchestration modules ([`evaluator`], [`strategy`], [`driver`]) combine the
//! two into the refinement loops and the experiment driver used by the CLI.

pub mod core;
pub mod driver;
pub mod evaluator;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod strategy;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
