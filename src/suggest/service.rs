//! Suggestion service boundary
//!
//! The engine only needs "messages in, assistant text out". The HTTP client
//! is compiled with the `remote` feature; without it every call reports a
//! transport failure.

use serde::{Deserialize, Serialize};

use super::history::ChatMessage;
use crate::config::ServiceConfig;
use crate::error::{KeroError, Result};

/// Anything that can answer a chat request
pub trait SuggestionService: Send {
    /// Send `messages` and return the assistant's reply text
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

impl<S: SuggestionService + Sync + ?Sized> SuggestionService for std::sync::Arc<S> {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).complete(messages)
    }
}

impl<S: SuggestionService + ?Sized> SuggestionService for Box<S> {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).complete(messages)
    }
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
}

/// Pull the assistant text out of a raw chat-completions response body
pub fn assistant_text(body: &str) -> Result<String> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| KeroError::UnparseableResponse {
            reason: format!("invalid completion body: {}", e),
            raw: body.to_string(),
        })?;

    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| KeroError::UnparseableResponse {
            reason: "completion has no choices".to_string(),
            raw: body.to_string(),
        })
}

/// OpenAI-compatible chat-completions client
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    config: ServiceConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn body(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        Ok(serde_json::to_string(&request)?)
    }

    #[cfg(feature = "remote")]
    fn send(&self, body: String) -> Result<String> {
        let timeout = std::time::Duration::from_millis(self.config.timeout_ms);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| KeroError::TransportFailure {
                reason: e.to_string(),
            })?;

        let response = client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| KeroError::TransportFailure {
                reason: if e.is_timeout() {
                    format!("timed out after {} ms", self.config.timeout_ms)
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        let text = response.text().map_err(|e| KeroError::TransportFailure {
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(KeroError::TransportFailure {
                reason: format!("service returned {}", status),
            });
        }
        Ok(text)
    }

    #[cfg(not(feature = "remote"))]
    fn send(&self, _body: String) -> Result<String> {
        Err(KeroError::TransportFailure {
            reason: "HTTP support not compiled. Build with --features remote".to_string(),
        })
    }
}

impl SuggestionService for ChatCompletionsClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if !self.config.has_api_key() {
            return Err(KeroError::MissingApiKey);
        }
        let body = self.body(messages)?;
        tracing::debug!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            messages = messages.len(),
            "Sending completion request"
        );
        let raw = self.send(body)?;
        assistant_text(&raw)
    }
}
