//! Qualitative rubric analysis.

use tracing::instrument;

use crate::io::chat::ChatMessage;
use crate::io::error::CollaboratorError;
use crate::io::ladder::{CallSpec, CompletionLadder, Escalation};
use crate::io::prompt::render_judge;

/// Best-effort narrative assessment of a text against rubric instructions.
pub trait QualitativeJudge {
    fn judge(&self, text: &str, instructions: &str) -> Result<String, CollaboratorError>;
}

const SYSTEM_PROMPT: &str = "You are a strict evaluator of text quality.";
const ESCALATION_NUDGE: &str =
    "Return ONLY the concise analysis now. Do NOT include chain-of-thought.";

pub struct LlmJudge<'a> {
    ladder: &'a CompletionLadder<'a>,
    model: String,
    max_tokens: u32,
}

impl<'a> LlmJudge<'a> {
    pub fn new(ladder: &'a CompletionLadder<'a>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            ladder,
            model: model.into(),
            max_tokens,
        }
    }
}

impl QualitativeJudge for LlmJudge<'_> {
    #[instrument(skip_all, fields(model = %self.model))]
    fn judge(&self, text: &str, instructions: &str) -> Result<String, CollaboratorError> {
        let prompt = render_judge(text, instructions).map_err(|e| CollaboratorError::Prompt {
            collaborator: "judge".to_string(),
            message: e.to_string(),
        })?;
        let spec = CallSpec {
            collaborator: "judge",
            model: self.model.clone(),
            temperature: Some(0.0),
            max_tokens: self.max_tokens,
            escalation: Escalation {
                nudge: ESCALATION_NUDGE.to_string(),
                floor: 1000,
                factor: 2.0,
            },
        };
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        self.ladder.complete(&spec, &messages)
    }
}
