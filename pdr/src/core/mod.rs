//! Deterministic, pure logic shared by the refinement loops.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod expert_scores;
pub mod preferences;
pub mod rubric;
pub mod satisfaction;
pub mod selector;
pub mod types;
