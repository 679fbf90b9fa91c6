//! Client for OpenAI-compatible chat completion endpoints.
//!
//! Works with any server exposing `POST {base_url}/chat/completions`
//! (OpenAI, Azure-style proxies, Ollama, vLLM, llama.cpp server).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionOptions, LanguageModel, LlmError};
use crate::config::LlmConfig;
use crate::secrets::{resolve_secret_optional, SecretError};

/// Cumulative token usage across all calls of one client.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    prompt_tokens: Arc<AtomicU64>,
    completion_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
    }

    /// `(prompt, completion, total)`
    pub fn get(&self) -> (u64, u64, u64) {
        let prompt = self.prompt_tokens.load(Ordering::Relaxed);
        let completion = self.completion_tokens.load(Ordering::Relaxed);
        (prompt, completion, prompt + completion)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    temperature: Option<f32>,
    usage: TokenUsage,
}

impl OpenAiCompatibleClient {
    /// Builds a client from config, resolving the API key.
    ///
    /// A missing key is allowed for local servers; a configured key file
    /// that cannot be read is an error.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = match resolve_secret_optional(
            config.api_key.as_deref(),
            config.api_key_file.as_deref(),
            config.api_key_env.as_deref(),
        ) {
            Ok(key) => key,
            Err(SecretError::EnvVarNotSet { name }) => {
                log::warn!("API key variable {} not set, calling without authorization", name);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Ok(Self::with_client(http, config, api_key))
    }

    pub fn with_client(
        http: reqwest::Client,
        config: &LlmConfig,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            usage: TokenUsage::default(),
        }
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &CompletionOptions,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature.or(self.temperature),
            response_format: options.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = self.build_request(messages, options);

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = parsed.usage {
            self.usage.add(usage.prompt_tokens, usage.completion_tokens);
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no message content".into()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
