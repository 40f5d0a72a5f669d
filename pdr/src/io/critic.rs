//! Comparative critique over a batch of candidates.

use tracing::instrument;

use crate::io::chat::ChatMessage;
use crate::io::error::CollaboratorError;
use crate::io::ladder::{CallSpec, CompletionLadder, Escalation};
use crate::io::prompt::render_critic;

/// Fixed critic instructions used by the critic-augmented strategy.
pub const CRITIC_INSTRUCTIONS: &str = "Evaluate each output for stylistic alignment, correctness, etc. \
Label strengths/weaknesses. Provide short improvement suggestions.";

/// Produces one opaque report covering every candidate. Failures are terminal.
pub trait Critic {
    fn critique(&self, outputs: &[String], instructions: &str) -> Result<String, CollaboratorError>;
}

const SYSTEM_PROMPT: &str = "You are an objective, detailed critic. For each output, provide:\n\
- Strengths\n- Weaknesses\n- Concrete improvements\nBe concise and structured.";
const ESCALATION_NUDGE: &str = "Return ONLY the critic report now. Be concise, bullet the \
strengths/weaknesses, and provide concrete improvements for each output. Do NOT include chain-of-thought.";

pub struct LlmCritic<'a> {
    ladder: &'a CompletionLadder<'a>,
    model: String,
    max_tokens: u32,
}

impl<'a> LlmCritic<'a> {
    pub fn new(ladder: &'a CompletionLadder<'a>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            ladder,
            model: model.into(),
            max_tokens,
        }
    }
}

impl Critic for LlmCritic<'_> {
    #[instrument(skip_all, fields(model = %self.model, outputs = outputs.len()))]
    fn critique(&self, outputs: &[String], instructions: &str) -> Result<String, CollaboratorError> {
        let prompt = render_critic(outputs, instructions).map_err(|e| CollaboratorError::Prompt {
            collaborator: "critic".to_string(),
            message: e.to_string(),
        })?;
        let spec = CallSpec {
            collaborator: "critic",
            model: self.model.clone(),
            temperature: None,
            max_tokens: self.max_tokens,
            escalation: Escalation {
                nudge: ESCALATION_NUDGE.to_string(),
                floor: 3000,
                factor: 2.0,
            },
        };
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        self.ladder.complete(&spec, &messages)
    }
}
