//! Post-hoc expert review of a final output.
//!
//! Runs once after an ad hoc loop and never influences iteration control. A
//! failed review degrades to empty scores with the error kept in the notes.

use anyhow::{Result, anyhow, bail};
use tracing::{instrument, warn};

use crate::core::expert_scores::parse_expert_reply;
use crate::core::types::ExpertEvaluation;
use crate::io::chat::{ChatMessage, ChatResponse};
use crate::io::ladder::{CallSpec, CompletionLadder, Escalation, Rung};
use crate::io::prompt::render_expert;

pub trait ExpertReviewer {
    fn review(&self, text: &str, domain: &str) -> ExpertEvaluation;
}

const SYSTEM_PROMPT: &str = "You are a strict domain expert grader. Return ONLY a single compact \
JSON object with keys: correctness_score (0-5), style_score (0-5), notes (string). No markdown, \
no code fences, no extra text.";
const JSON_NUDGE: &str = "Return ONLY valid JSON with keys {\"correctness_score\": number, \
\"style_score\": number, \"notes\": \"string\"} with no markdown, no backticks, no extra text.";

pub struct LlmExpert<'a> {
    ladder: &'a CompletionLadder<'a>,
    model: String,
    max_tokens: u32,
}

impl<'a> LlmExpert<'a> {
    pub fn new(ladder: &'a CompletionLadder<'a>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            ladder,
            model: model.into(),
            max_tokens,
        }
    }

    fn spec(&self) -> CallSpec {
        CallSpec {
            collaborator: "expert",
            model: self.model.clone(),
            temperature: Some(0.0),
            max_tokens: self.max_tokens,
            escalation: Escalation {
                nudge: JSON_NUDGE.to_string(),
                floor: 600,
                factor: 2.0,
            },
        }
    }

    fn try_review(&self, text: &str, domain: &str) -> Result<ExpertEvaluation> {
        let prompt = render_expert(text, domain)?;
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let spec = self.spec();

        let (_, first) = self.ladder.call(&spec, &messages, Rung::Primary)?;
        if let Some(parsed) = parse_expert_reply(&first.content) {
            return Ok(parsed);
        }
        if !should_retry(&first, self.max_tokens) {
            bail!(
                "no parsable scores (finish_reason={}, content_len={})",
                first.finish_reason.as_deref().unwrap_or("none"),
                first.content.len()
            );
        }

        let (_, second) = self.ladder.call(&spec, &messages, Rung::Escalated(1))?;
        parse_expert_reply(&second.content).ok_or_else(|| {
            anyhow!(
                "no parsable scores after retry (finish_reason={}, content_len={})",
                second.finish_reason.as_deref().unwrap_or("none"),
                second.content.len()
            )
        })
    }
}

/// Empty, truncated, or reasoning-dominated replies earn one stronger retry.
pub fn should_retry(response: &ChatResponse, max_tokens: u32) -> bool {
    let heavy_reasoning = (f64::from(max_tokens) * 0.8) as u32;
    response.content.trim().is_empty()
        || response.finish_reason.as_deref() == Some("length")
        || response.reasoning_tokens >= heavy_reasoning.max(64)
}

impl ExpertReviewer for LlmExpert<'_> {
    #[instrument(skip_all, fields(model = %self.model, domain = %domain))]
    fn review(&self, text: &str, domain: &str) -> ExpertEvaluation {
        match self.try_review(text, domain) {
            Ok(eval) => eval,
            Err(err) => {
                warn!(error = %err, "expert review failed");
                ExpertEvaluation {
                    correctness_score: None,
                    style_score: None,
                    notes: format!("expert evaluation failed ({}): {err:#}", self.model),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::retry::RetryPolicy;
    use crate::test_support::ScriptedChatClient;

    fn reply(content: &str, finish: &str) -> ChatResponse {
        ChatResponse {
            content: content.to_string(),
            finish_reason: Some(finish.to_string()),
            reasoning_tokens: 0,
        }
    }

    #[test]
    fn json_reply_is_parsed_on_first_attempt() {
        let client = ScriptedChatClient::with_contents([
            r#"{"correctness_score": 4, "style_score": 3.5, "notes": "clear"}"#,
        ]);
        let ladder = CompletionLadder::new(&client, RetryPolicy::no_delay(1), 1, vec![], vec![]);
        let eval = LlmExpert::new(&ladder, "gpt-4o", 400).review("text", "technical");
        assert_eq!(eval.correctness_score, Some(4.0));
        assert_eq!(eval.style_score, Some(3.5));
        assert_eq!(client.requests().len(), 1);
    }

    #[test]
    fn truncated_reply_retries_with_bigger_budget() {
        let client = ScriptedChatClient::new(vec![
            Ok(reply("", "length")),
            Ok(reply("correctness: 4/5, style: 2/5", "stop")),
        ]);
        let ladder = CompletionLadder::new(&client, RetryPolicy::no_delay(1), 1, vec![], vec![]);
        let eval = LlmExpert::new(&ladder, "gpt-4o", 400).review("text", "general");
        assert_eq!(eval.style_score, Some(2.0));

        let requests = client.requests();
        assert_eq!(requests[1].max_tokens, 800);
        assert_eq!(requests[1].messages[0].content, JSON_NUDGE);
    }

    #[test]
    fn unparsable_reply_degrades_to_notes() {
        let client = ScriptedChatClient::with_contents(["I liked it."]);
        let ladder = CompletionLadder::new(&client, RetryPolicy::no_delay(1), 1, vec![], vec![]);
        let eval = LlmExpert::new(&ladder, "gpt-4o", 400).review("text", "general");
        assert_eq!(eval.correctness_score, None);
        assert!(eval.notes.contains("no parsable scores"), "{}", eval.notes);
        assert_eq!(client.requests().len(), 1);
    }

    #[test]
    fn heavy_reasoning_triggers_retry() {
        let mut resp = reply("", "stop");
        resp.content = "words".to_string();
        resp.reasoning_tokens = 320;
        assert!(should_retry(&resp, 400));
        resp.reasoning_tokens = 10;
        assert!(!should_retry(&resp, 400));
    }
}
