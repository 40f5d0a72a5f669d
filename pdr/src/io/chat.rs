//! Chat-completion transport.
//!
//! [`ChatClient`] is the single seam between the refinement loops and a remote
//! model. [`OpenAiClient`] speaks the OpenAI-compatible `/chat/completions`
//! protocol; tests use a scripted client instead.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::io::error::{ChatError, looks_like_gateway_page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Omitted from the wire when `None`.
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
    pub finish_reason: Option<String>,
    pub reasoning_tokens: u32,
}

/// Abstraction over chat-completion backends.
pub trait ChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;
}

impl<T: ChatClient + ?Sized> ChatClient for &T {
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        (**self).complete(request)
    }
}

/// Blocking client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    http: reqwest::blocking::Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: String, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
            http,
        })
    }

    fn map_send_error(&self, err: &reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout(self.timeout_secs)
        } else {
            ChatError::Connection(err.to_string())
        }
    }
}

/// Wire body for `/chat/completions`.
pub fn request_body(request: &ChatRequest) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": request.model,
        "messages": request.messages,
        "max_completion_tokens": request.max_tokens,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    body
}

impl ChatClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %request.model, max_tokens = request.max_tokens))]
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body(request))
            .send()
            .map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.map_send_error(&e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "chat completion response");
        if !status.is_success() {
            return Err(ChatError::from_status(status.as_u16(), &body));
        }
        parse_completion(&body)
    }
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    completion_tokens_details: Option<UsageDetails>,
}

#[derive(Deserialize)]
struct UsageDetails {
    reasoning_tokens: Option<u32>,
}

/// Parse a successful completion body.
///
/// Content is returned untrimmed; a missing message counts as empty content.
pub fn parse_completion(body: &str) -> Result<ChatResponse, ChatError> {
    let parsed: CompletionBody =
        serde_json::from_str(body).map_err(|e| ChatError::InvalidResponse {
            message: e.to_string(),
            transient: looks_like_gateway_page(body),
        })?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::InvalidResponse {
            message: "response has no choices".to_string(),
            transient: false,
        })?;
    let reasoning_tokens = parsed
        .usage
        .and_then(|u| u.completion_tokens_details)
        .and_then(|d| d.reasoning_tokens)
        .unwrap_or(0);
    Ok(ChatResponse {
        content: choice.message.and_then(|m| m.content).unwrap_or_default(),
        finish_reason: choice.finish_reason,
        reasoning_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_finish_reason_and_reasoning_usage() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
            "usage": {"completion_tokens_details": {"reasoning_tokens": 42}}
        }"#;
        let resp = parse_completion(body).expect("parse");
        assert_eq!(resp.content, "hi");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.reasoning_tokens, 42);
    }

    #[test]
    fn null_content_is_empty() {
        let body = r#"{"choices": [{"message": {"content": null}, "finish_reason": "length"}]}"#;
        let resp = parse_completion(body).expect("parse");
        assert_eq!(resp.content, "");
        assert_eq!(resp.reasoning_tokens, 0);
    }

    #[test]
    fn html_body_is_transient() {
        let err = parse_completion("<html><body>502 Bad Gateway</body></html>").expect_err("html");
        assert!(err.is_transient());
        let err = parse_completion("{\"choices\": []}").expect_err("empty");
        assert!(!err.is_transient());
    }

    #[test]
    fn temperature_is_omitted_when_unset() {
        let mut request = ChatRequest {
            model: "gpt-5".to_string(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            temperature: None,
            max_tokens: 500,
        };
        let body = request_body(&request);
        assert!(body.get("temperature").is_none());
        assert_eq!(body["max_completion_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");

        request.temperature = Some(0.5);
        assert_eq!(request_body(&request)["temperature"], 0.5);
    }
}
