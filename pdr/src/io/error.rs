//! Typed failures for chat collaborators.

use thiserror::Error;

/// Transport-level failure of a single chat completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("server error (HTTP {status})")]
    Server { status: u16 },

    #[error("request rejected (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("invalid response: {message}")]
    InvalidResponse { message: String, transient: bool },
}

impl ChatError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => ChatError::RateLimited,
            500..=599 => ChatError::Server { status },
            _ if looks_like_gateway_page(body) => ChatError::InvalidResponse {
                message: format!("HTTP {status} with HTML body"),
                transient: true,
            },
            _ => ChatError::Client {
                status,
                message: body.chars().take(200).collect(),
            },
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ChatError::RateLimited
            | ChatError::Server { .. }
            | ChatError::Connection(_)
            | ChatError::Timeout(_) => true,
            ChatError::InvalidResponse { transient, .. } => *transient,
            ChatError::Client { .. } => false,
        }
    }
}

/// HTML error pages from proxies/CDNs in front of the API.
pub fn looks_like_gateway_page(body: &str) -> bool {
    let head: String = body.chars().take(512).collect::<String>().to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype html") || head.contains("cloudflare")
}

/// Terminal collaborator failure that aborts the current (persona, task) run.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{collaborator} failed after {attempts} attempt(s): {source}")]
    Exhausted {
        collaborator: String,
        attempts: u32,
        #[source]
        source: ChatError,
    },

    #[error("{collaborator} request rejected: {source}")]
    Rejected {
        collaborator: String,
        #[source]
        source: ChatError,
    },

    #[error("{collaborator} prompt could not be rendered: {message}")]
    Prompt {
        collaborator: String,
        message: String,
    },

    #[error(
        "{collaborator} returned empty content (model={model}, finish_reason={}, reasoning_tokens={reasoning_tokens}, max_tokens={max_tokens})",
        .finish_reason.as_deref().unwrap_or("none")
    )]
    EmptyCompletion {
        collaborator: String,
        model: String,
        finish_reason: Option<String>,
        reasoning_tokens: u32,
        max_tokens: u32,
    },
}
