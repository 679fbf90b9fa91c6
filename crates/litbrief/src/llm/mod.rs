//! Language-model abstraction used for query generation and relevancy scoring.

pub mod json;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::Retryable;

pub use json::extract_json;
pub use openai::{OpenAiCompatibleClient, TokenUsage};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
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

/// Per-call knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    /// Ask the provider for a JSON object response.
    pub json_response: bool,
    /// Overrides the client's configured temperature.
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    pub fn json() -> Self {
        Self {
            json_response: true,
            temperature: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Language model rate limited the request")]
    RateLimited,

    #[error("Language model returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Language model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid language model response: {0}")]
    InvalidResponse(String),

    #[error("Language model is not configured: {0}")]
    Configuration(String),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited | LlmError::Transport(_) | LlmError::Timeout(_) => true,
            LlmError::Http { status, .. } => *status >= 500,
            LlmError::InvalidResponse(_) | LlmError::Configuration(_) | LlmError::Secret(_) => {
                false
            }
        }
    }
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        LlmError::is_retryable(self)
    }

    fn timed_out(after: Duration) -> Self {
        LlmError::Timeout(after)
    }
}

/// A chat-style language model. One call per `complete`; retry is the caller's concern.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
