//! Shared deterministic types for the refinement core.
//!
//! These types define stable contracts between the evaluator, the strategies
//! and persistence. They do not depend on external state or I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scoring rubric attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    /// Inclusive `[min, max]` word-count bounds.
    pub word_count_range: (usize, usize),
    /// Substrings that must appear (case-insensitive). May be empty.
    #[serde(default)]
    pub must_include: Vec<String>,
    /// Free-text instructions handed to the qualitative judge.
    #[serde(default)]
    pub evaluation_instructions: String,
}

/// A fixed writing or engineering task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Expert-review domain label.
    #[serde(default = "default_domain")]
    pub domain: String,
    pub target_spec: String,
    pub rubric: Rubric,
}

fn default_domain() -> String {
    "general".to_string()
}

/// A synthetic participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub description: String,
}

impl Persona {
    /// System identity asserted to the generator.
    pub fn system_prompt(&self) -> String {
        format!("You are {}. {}", self.name, self.description)
    }
}

/// Outcome of scoring one text against a rubric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub word_count_ok: bool,
    pub must_include_ok: bool,
    pub score: u32,
    pub analysis: Option<String>,
}

/// Post-hoc expert review of a final output. Scores are on a 0..=5 scale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpertEvaluation {
    pub correctness_score: Option<f64>,
    pub style_score: Option<f64>,
    pub notes: String,
}

/// Refinement strategy identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    AdHoc,
    Pdr,
    PdrCritic,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::AdHoc, StrategyKind::Pdr, StrategyKind::PdrCritic];

    /// Stable file-name prefix (`adhoc`, `pdr`, `pdr_critic`).
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::AdHoc => "adhoc",
            StrategyKind::Pdr => "pdr",
            StrategyKind::PdrCritic => "pdr_critic",
        }
    }

    /// Human label written into result records.
    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::AdHoc => "Ad Hoc",
            StrategyKind::Pdr => "PDR",
            StrategyKind::PdrCritic => "PDR+Critic",
        }
    }

    /// Normalize a free-form label as found in result files.
    pub fn from_label(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();
        match key.as_str() {
            "adhoc" => Some(StrategyKind::AdHoc),
            "pdr" => Some(StrategyKind::Pdr),
            "pdrcritic" | "pdr+critic" | "pdrpluscritic" | "pdrwithcritic" => {
                Some(StrategyKind::PdrCritic)
            }
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::from_label(s).ok_or_else(|| format!("unknown strategy {s:?}"))
    }
}

/// Loop bounds shared by every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementSettings {
    pub max_iterations: u32,
    pub score_threshold: u32,
    pub num_outputs_per_iter: u32,
    pub candidate_temperature: f32,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            score_threshold: 85,
            num_outputs_per_iter: 3,
            candidate_temperature: 0.7,
        }
    }
}

/// One finished (persona, task, strategy) simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub participant_name: String,
    pub task_name: String,
    pub strategy: StrategyKind,
    pub model: String,
    pub iteration_count: u32,
    pub time_spent_sec: f64,
    pub final_score: u32,
    pub final_output: String,
    pub satisfaction_score: f64,
    /// Present only when an expert reviewer ran.
    pub expert: Option<ExpertEvaluation>,
    /// Last critic report of a critic-augmented run.
    pub final_critic_report: Option<String>,
}

impl RunResult {
    /// Flatten into an ordered field list for persistence.
    ///
    /// Ad hoc runs carry the subjective placeholders, left empty in simulation.
    pub fn record(&self) -> Record {
        let mut record = Record::default();
        record.push("participant_name", &self.participant_name);
        record.push("task_name", &self.task_name);
        record.push("strategy", self.strategy.label());
        record.push("model", &self.model);
        record.push("iteration_count", self.iteration_count.to_string());
        record.push("time_spent_sec", self.time_spent_sec.to_string());
        record.push("final_score", self.final_score.to_string());
        record.push("satisfaction_score", self.satisfaction_score.to_string());
        if self.strategy == StrategyKind::AdHoc {
            record.push("perceived_quality", "");
            record.push("usability_score", "");
        }
        if let Some(expert) = &self.expert {
            record.push("expert_correctness_score", opt_num(expert.correctness_score));
            record.push("expert_style_score", opt_num(expert.style_score));
            record.push("expert_notes", &expert.notes);
        }
        if let Some(report) = &self.final_critic_report {
            record.push("final_critic_report", report);
        }
        record.push("final_output", &self.final_output);
        record
    }
}

fn opt_num(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Ordered `(column, value)` pairs for one persisted row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::default();
        for (k, v) in iter {
            record.push(k, v);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(strategy: StrategyKind) -> RunResult {
        RunResult {
            participant_name: "Participant_A".to_string(),
            task_name: "Creative_Writing".to_string(),
            strategy,
            model: "gpt-4o".to_string(),
            iteration_count: 2,
            time_spent_sec: 1.5,
            final_score: 100,
            final_output: "text".to_string(),
            satisfaction_score: 5.0,
            expert: None,
            final_critic_report: None,
        }
    }

    #[test]
    fn strategy_labels_normalize() {
        for raw in ["adhoc", "ad-hoc", "Ad Hoc", "ad_hoc"] {
            assert_eq!(StrategyKind::from_label(raw), Some(StrategyKind::AdHoc), "{raw}");
        }
        assert_eq!(StrategyKind::from_label("PDR"), Some(StrategyKind::Pdr));
        for raw in ["pdr+critic", "PDR+Critic", "pdr_critic", "pdrcritic", "pdr_plus_critic"] {
            assert_eq!(StrategyKind::from_label(raw), Some(StrategyKind::PdrCritic), "{raw}");
        }
        assert_eq!(StrategyKind::from_label("baseline"), None);
    }

    #[test]
    fn adhoc_record_has_placeholders_before_output() {
        let record = run(StrategyKind::AdHoc).record();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(
            keys,
            [
                "participant_name",
                "task_name",
                "strategy",
                "model",
                "iteration_count",
                "time_spent_sec",
                "final_score",
                "satisfaction_score",
                "perceived_quality",
                "usability_score",
                "final_output",
            ]
        );
        assert_eq!(record.get("perceived_quality"), Some(""));
        assert_eq!(record.get("strategy"), Some("Ad Hoc"));
    }

    #[test]
    fn critic_record_carries_report_and_no_placeholders() {
        let mut result = run(StrategyKind::PdrCritic);
        result.final_critic_report = Some("report".to_string());
        let record = result.record();
        assert_eq!(record.get("final_critic_report"), Some("report"));
        assert_eq!(record.get("perceived_quality"), None);
    }

    #[test]
    fn expert_fields_leave_missing_scores_empty() {
        let mut result = run(StrategyKind::AdHoc);
        result.expert = Some(ExpertEvaluation {
            correctness_score: Some(4.5),
            style_score: None,
            notes: "ok".to_string(),
        });
        let record = result.record();
        assert_eq!(record.get("expert_correctness_score"), Some("4.5"));
        assert_eq!(record.get("expert_style_score"), Some(""));
    }

    #[test]
    fn persona_system_prompt() {
        let persona = Persona {
            name: "Participant_A".to_string(),
            description: "A business expert.".to_string(),
        };
        assert_eq!(persona.system_prompt(), "You are Participant_A. A business expert.");
    }
}
