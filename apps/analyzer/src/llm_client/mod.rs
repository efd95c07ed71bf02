/// LLM Client — the single point of entry for evaluation-service calls.
///
/// Talks to an Azure OpenAI chat-completions deployment. One call is one
/// attempt; retry and timeout policy live with the caller (see `retry`).
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::LlmConfig;
use crate::retry::Retryable;

/// Evaluation-service seam. `LlmClient` is the production implementation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(e) => !e.is_builder() && !e.is_decode(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Timeout(_) => true,
            LlmError::InvalidEndpoint(_) | LlmError::EmptyContent => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        LlmError::Timeout(after)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if it has any non-blank content.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    url: Url,
    api_key: String,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(config: &LlmConfig, request_timeout: Duration) -> Result<Self, LlmError> {
        let url = completions_url(config)?;
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Makes one call to the chat-completions API and returns the full response.
    pub async fn call(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        if let Some(usage) = &chat.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                finish_reason = chat.choices.first().and_then(|c| c.finish_reason.as_deref()),
                "LLM call succeeded"
            );
        }
        Ok(chat)
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let response = self.call(system, prompt, temperature).await?;
        response
            .text()
            .map(String::from)
            .ok_or(LlmError::EmptyContent)
    }
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={v}`
fn completions_url(config: &LlmConfig) -> Result<Url, LlmError> {
    let raw = format!(
        "{}/openai/deployments/{}/chat/completions",
        config.endpoint.trim_end_matches('/'),
        config.deployment
    );
    let mut url = Url::parse(&raw).map_err(|_| LlmError::InvalidEndpoint(config.endpoint.clone()))?;
    url.query_pairs_mut()
        .append_pair("api-version", &config.api_version);
    Ok(url)
}
