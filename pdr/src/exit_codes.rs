//! Stable exit codes for the `pdr` and `pdr-analysis` binaries.

/// Command succeeded (skipped runs under `on_error = "skip"` included).
pub const OK: i32 = 0;
/// Invalid input, config or catalog, or any other error.
pub const INVALID: i32 = 1;
/// A run aborted on a terminal collaborator failure under `on_error = "halt"`.
pub const HALTED: i32 = 2;
