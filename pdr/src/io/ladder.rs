//! Empty-completion ladder shared by every chat collaborator.
//!
//! Reasoning models sometimes spend the whole token budget thinking and return
//! no text. The ladder climbs a fixed sequence of rungs until one yields
//! non-empty content:
//!
//! 1. `Primary`: the collaborator's own model and budget.
//! 2. `Escalated(n)`: same model, a system nudge prepended and a larger budget.
//! 3. `Fallback(i)`: each configured fallback model in order, nudged, base budget.
//!
//! Transport failures are handled per rung by [`RetryPolicy`].

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::io::chat::{ChatClient, ChatMessage, ChatRequest, ChatResponse};
use crate::io::error::CollaboratorError;
use crate::io::retry::RetryPolicy;

/// Ladder knobs from the `[ladder]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderSettings {
    /// Escalated attempts before model fallback. Zero disables both.
    pub content_retries: u32,
    pub generator_max_tokens: u32,
    pub judge_max_tokens: u32,
    pub critic_max_tokens: u32,
    pub expert_max_tokens: u32,
}

impl Default for LadderSettings {
    fn default() -> Self {
        Self {
            content_retries: 1,
            generator_max_tokens: 1000,
            judge_max_tokens: 500,
            critic_max_tokens: 1200,
            expert_max_tokens: 400,
        }
    }
}

/// How a collaborator escalates after an empty completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub nudge: String,
    pub floor: u32,
    pub factor: f64,
}

impl Escalation {
    pub fn budget(&self, max_tokens: u32) -> u32 {
        let scaled = (f64::from(max_tokens) * self.factor) as u32;
        scaled.max(self.floor)
    }
}

/// Per-collaborator call parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    pub collaborator: &'static str,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub escalation: Escalation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rung {
    Primary,
    Escalated(u32),
    Fallback(usize),
}

/// Next rung after an empty completion, or `None` when the ladder is exhausted.
pub fn next_rung(current: Rung, content_retries: u32, fallbacks: usize) -> Option<Rung> {
    if content_retries == 0 {
        return None;
    }
    match current {
        Rung::Primary => Some(Rung::Escalated(1)),
        Rung::Escalated(n) if n < content_retries => Some(Rung::Escalated(n + 1)),
        Rung::Escalated(_) => (fallbacks > 0).then_some(Rung::Fallback(0)),
        Rung::Fallback(i) => (i + 1 < fallbacks).then_some(Rung::Fallback(i + 1)),
    }
}

pub struct CompletionLadder<'a> {
    client: &'a dyn ChatClient,
    retry: RetryPolicy,
    content_retries: u32,
    fallback_models: Vec<String>,
    no_temperature: Vec<String>,
}

impl<'a> CompletionLadder<'a> {
    pub fn new(
        client: &'a dyn ChatClient,
        retry: RetryPolicy,
        content_retries: u32,
        fallback_models: Vec<String>,
        no_temperature: Vec<String>,
    ) -> Self {
        Self {
            client,
            retry,
            content_retries,
            fallback_models,
            no_temperature,
        }
    }

    /// Build the wire request for one rung.
    pub fn request_for(&self, spec: &CallSpec, messages: &[ChatMessage], rung: Rung) -> ChatRequest {
        let (model, max_tokens, nudged) = match rung {
            Rung::Primary => (spec.model.clone(), spec.max_tokens, false),
            Rung::Escalated(_) => (
                spec.model.clone(),
                spec.escalation.budget(spec.max_tokens),
                true,
            ),
            Rung::Fallback(i) => {
                let model = self
                    .fallback_models
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| spec.model.clone());
                (model, spec.max_tokens, true)
            }
        };
        let mut all = Vec::with_capacity(messages.len() + 1);
        if nudged {
            all.push(ChatMessage::system(spec.escalation.nudge.clone()));
        }
        all.extend_from_slice(messages);
        let temperature = if self.no_temperature.iter().any(|m| *m == model) {
            None
        } else {
            spec.temperature
        };
        ChatRequest {
            model,
            messages: all,
            temperature,
            max_tokens,
        }
    }

    /// One rung: a single logical call with transport retries.
    pub fn call(
        &self,
        spec: &CallSpec,
        messages: &[ChatMessage],
        rung: Rung,
    ) -> Result<(ChatRequest, ChatResponse), CollaboratorError> {
        let request = self.request_for(spec, messages, rung);
        let response = self
            .retry
            .run(spec.collaborator, || self.client.complete(&request))?;
        Ok((request, response))
    }

    /// Climb the ladder until some rung yields non-empty (trimmed) content.
    #[instrument(skip_all, fields(collaborator = spec.collaborator, model = %spec.model))]
    pub fn complete(
        &self,
        spec: &CallSpec,
        messages: &[ChatMessage],
    ) -> Result<String, CollaboratorError> {
        let mut rung = Rung::Primary;
        loop {
            let (request, response) = self.call(spec, messages, rung)?;
            let content = response.content.trim();
            if !content.is_empty() {
                debug!(?rung, chars = content.len(), "completion ok");
                return Ok(content.to_string());
            }
            warn!(
                ?rung,
                model = %request.model,
                finish_reason = response.finish_reason.as_deref().unwrap_or("none"),
                reasoning_tokens = response.reasoning_tokens,
                "empty completion"
            );
            match next_rung(rung, self.content_retries, self.fallback_models.len()) {
                Some(next) => rung = next,
                None => {
                    return Err(CollaboratorError::EmptyCompletion {
                        collaborator: spec.collaborator.to_string(),
                        model: request.model,
                        finish_reason: response.finish_reason,
                        reasoning_tokens: response.reasoning_tokens,
                        max_tokens: request.max_tokens,
                    });
                }
            }
        }
    }
}
