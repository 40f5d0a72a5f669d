//! Experiment configuration (`pdr.toml`).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::core::types::RefinementSettings;
use crate::io::ladder::LadderSettings;
use crate::io::retry::RetryPolicy;

/// Experiment configuration (TOML).
///
/// Every section is optional; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExperimentConfig {
    pub api: ApiConfig,
    pub models: ModelConfig,
    pub retry: RetryPolicy,
    pub ladder: LadderSettings,
    pub refinement: RefinementSettings,
    pub evaluation: EvaluationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub key_env: String,
    /// File holding the API key, used when the variable is unset.
    pub key_file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            key_env: "OPENAI_API_KEY".to_string(),
            key_file: None,
            timeout_secs: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub participant: String,
    pub judge: String,
    pub critic: String,
    pub expert: String,
    /// Tried in order once the primary model keeps returning empty content.
    pub fallbacks: Vec<String>,
    /// Models that reject an explicit `temperature`.
    pub no_temperature: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            participant: "gpt-5".to_string(),
            judge: "gpt-4o".to_string(),
            critic: "gpt-5".to_string(),
            expert: "gpt-4o".to_string(),
            fallbacks: vec!["gpt-4o".to_string()],
            no_temperature: vec![
                "gpt-5".to_string(),
                "gpt-5-mini".to_string(),
                "gpt-4o-mini".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Ask the judge model for a qualitative analysis of every output.
    pub qualitative: bool,
    /// Run the expert reviewer after ad hoc runs.
    pub expert: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            qualitative: true,
            expert: true,
        }
    }
}

/// What the driver does when a run aborts on a terminal collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Record the failure and continue with the next pair.
    #[default]
    Skip,
    /// Stop the experiment.
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
    pub on_error: ErrorPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            on_error: ErrorPolicy::Skip,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must be non-empty");
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be > 0");
        }
        for (field, model) in [
            ("participant", &self.models.participant),
            ("judge", &self.models.judge),
            ("critic", &self.models.critic),
            ("expert", &self.models.expert),
        ] {
            if model.trim().is_empty() {
                bail!("models.{field} must be non-empty");
            }
        }
        self.retry.validate()?;
        let r = &self.refinement;
        if r.max_iterations == 0 {
            bail!("refinement.max_iterations must be > 0");
        }
        if r.num_outputs_per_iter == 0 {
            bail!("refinement.num_outputs_per_iter must be > 0");
        }
        if !(0.0..=2.0).contains(&r.candidate_temperature) {
            bail!("refinement.candidate_temperature must be within [0, 2]");
        }
        let l = &self.ladder;
        if [
            l.generator_max_tokens,
            l.judge_max_tokens,
            l.critic_max_tokens,
            l.expert_max_tokens,
        ]
        .contains(&0)
        {
            bail!("ladder token budgets must be > 0");
        }
        Ok(())
    }

    /// API key from the configured environment variable, else the key file.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Ok(key) = env::var(&self.api.key_env) {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        let path = self.api.key_file.as_ref().ok_or_else(|| {
            anyhow!(
                "no API key: set {} or configure api.key_file",
                self.api.key_env
            )
        })?;
        let key = fs::read_to_string(path)
            .with_context(|| format!("read api key file {}", path.display()))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("api key file {} is empty", path.display());
        }
        Ok(key.to_string())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ExperimentConfig::default()`.
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    if !path.exists() {
        let cfg = ExperimentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ExperimentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ExperimentConfig::default());
        assert_eq!(cfg.refinement.max_iterations, 5);
        assert_eq!(cfg.refinement.score_threshold, 85);
        assert_eq!(cfg.retry.max_attempts, 6);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pdr.toml");
        fs::write(
            &path,
            "[refinement]\nmax_iterations = 3\n\n[output]\non_error = \"halt\"\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.refinement.max_iterations, 3);
        assert_eq!(cfg.refinement.num_outputs_per_iter, 3);
        assert_eq!(cfg.output.on_error, ErrorPolicy::Halt);
        assert_eq!(cfg.models, ModelConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pdr.toml");
        fs::write(&path, "[refinement]\nnum_outputs_per_iter = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(err.to_string().contains("num_outputs_per_iter"));
    }

    #[test]
    fn api_key_falls_back_to_key_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let key_path = temp.path().join("key.txt");
        fs::write(&key_path, "sk-test\n").expect("write");
        let mut cfg = ExperimentConfig::default();
        cfg.api.key_env = "PDR_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        cfg.api.key_file = Some(key_path);
        assert_eq!(cfg.resolve_api_key().expect("key"), "sk-test");

        cfg.api.key_file = None;
        assert!(cfg.resolve_api_key().is_err());
    }
}
