//! Language-model client seam and its OpenAI-compatible HTTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ApiKey, ConfigError, ModelConfig};
use crate::error::ModelError;

/// Longest slice of an upstream error body kept in a [`ModelError`].
const MAX_ERROR_BODY_CHARS: usize = 300;

const SYSTEM_PROMPT: &str =
    "You are a careful interpreter of the I Ching. Answer only with the JSON object requested.";

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier recorded on every interpretation this client produces.
    fn model_id(&self) -> &str;

    /// Send one prompt and return the model's free-text reply.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        (**self).complete(prompt).await
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Client for a `chat/completions` endpoint.
pub struct HttpModelClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

impl HttpModelClient {
    /// Build a client from `config`. `LLM_API_KEY` must be set.
    pub fn new(config: &ModelConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ConfigError::Missing { var: "LLM_API_KEY" })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout {
                after_secs: self.timeout_secs,
            }
        } else {
            ModelError::Generic(self.redact(&e.without_url().to_string()))
        }
    }

    /// Map a non-2xx response to the matching [`ModelError`].
    async fn ensure_success(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ModelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let code = status.as_u16();
        match code {
            401 | 403 => Err(ModelError::AuthFailed { status: code }),
            429 => Err(ModelError::RateLimited { status: code }),
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                Err(ModelError::Generic(format!(
                    "HTTP {code}: {}",
                    truncate(&self.redact(&body), MAX_ERROR_BODY_CHARS)
                )))
            }
        }
    }

    fn redact(&self, text: &str) -> String {
        let key = self.api_key.expose();
        if key.is_empty() {
            text.to_string()
        } else {
            text.replace(key, "***")
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.ensure_success(response).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ModelError::Generic("response contained no message content".into()))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
