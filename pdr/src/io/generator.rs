//! Participant text generation.

use tracing::instrument;

use crate::core::types::Persona;
use crate::io::chat::ChatMessage;
use crate::io::error::CollaboratorError;
use crate::io::ladder::{CallSpec, CompletionLadder, Escalation};

/// Produces one completion for a persona. Terminal failures abort the run.
pub trait Generator {
    /// Model name recorded in results.
    fn model(&self) -> &str;

    fn generate(
        &self,
        persona: &Persona,
        instruction: &str,
        temperature: f32,
    ) -> Result<String, CollaboratorError>;
}

const ESCALATION_NUDGE: &str = "Return ONLY the final answer now. Do NOT include explanations, \
commentary or hidden chain-of-thought; emit the answer immediately.";

/// [`Generator`] backed by a chat-completion model.
pub struct LlmGenerator<'a> {
    ladder: &'a CompletionLadder<'a>,
    model: String,
    max_tokens: u32,
}

impl<'a> LlmGenerator<'a> {
    pub fn new(ladder: &'a CompletionLadder<'a>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            ladder,
            model: model.into(),
            max_tokens,
        }
    }
}

impl Generator for LlmGenerator<'_> {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(persona = %persona.name, model = %self.model))]
    fn generate(
        &self,
        persona: &Persona,
        instruction: &str,
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        let spec = CallSpec {
            collaborator: "generator",
            model: self.model.clone(),
            temperature: Some(temperature),
            max_tokens: self.max_tokens,
            escalation: Escalation {
                nudge: ESCALATION_NUDGE.to_string(),
                floor: 4096,
                factor: 2.5,
            },
        };
        let messages = [
            ChatMessage::system(persona.system_prompt()),
            ChatMessage::user(instruction),
        ];
        self.ladder.complete(&spec, &messages)
    }
}
