//! Result file naming and per-invocation run manifests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{RefinementSettings, StrategyKind};
use crate::io::config::ErrorPolicy;

/// A (persona, task) pair whose run aborted on a terminal collaborator failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub participant_name: String,
    pub task_name: String,
    pub error: String,
}

/// Metadata for one strategy invocation, persisted next to its CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub strategy: String,
    pub results_file: String,
    pub catalog_source: String,
    /// SHA-256 of the catalog TOML for reproducibility tracking.
    pub catalog_hash: String,
    pub participant_model: String,
    pub judge_model: Option<String>,
    pub critic_model: Option<String>,
    pub expert_model: Option<String>,
    pub refinement: RefinementSettings,
    pub on_error: ErrorPolicy,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    pub completed: u32,
    pub failures: Vec<RunFailure>,
    pub halted: bool,
}

impl RunManifest {
    pub fn set_times(&mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) {
        self.start_time = started_at.to_rfc3339();
        self.end_time = finished_at.to_rfc3339();
        self.duration_secs = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;
    }
}

/// `{dir}/{strategy}_results_{stamp}.csv`
pub fn results_path(dir: &Path, strategy: StrategyKind, stamp: i64) -> PathBuf {
    dir.join(format!("{}_results_{stamp}.csv", strategy.as_str()))
}

/// `{dir}/{strategy}_manifest_{stamp}.json`
pub fn manifest_path(dir: &Path, strategy: StrategyKind, stamp: i64) -> PathBuf {
    dir.join(format!("{}_manifest_{stamp}.json", strategy.as_str()))
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write manifest {}", path.display()))?;
    Ok(())
}
