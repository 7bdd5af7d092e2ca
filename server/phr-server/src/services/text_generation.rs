use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ChatMessage;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation is not configured (OPENAI_API_KEY is unset)")]
    NotConfigured,

    #[error("could not reach text generation provider: {0}")]
    Http(String),

    #[error("provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("could not parse provider response: {0}")]
    ResponseParsing(String),

    #[error("provider returned no content")]
    EmptyResponse,
}

/// One chat-completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(model: &str, system: &str, user: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![message("system", system), message("user", user)],
            temperature: 0.7,
            max_tokens: 800,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

pub fn message(role: &str, content: &str) -> ChatMessage {
    ChatMessage {
        role: role.to_string(),
        content: content.to_string(),
    }
}

/// Text-generation provider boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
///
/// No retries and no timeout beyond the reqwest defaults.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = OpenAiClient::new("https://api.openai.com/v1/", Some("  ".to_string()));
        assert!(!client.is_configured());

        let result = client.complete(CompletionRequest::new("m", "s", "u")).await;
        assert!(matches!(result, Err(GenerationError::NotConfigured)));
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let request = CompletionRequest::new("gpt-4o-mini", "sys", "hello").max_tokens(500);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["max_tokens"], 500);
    }
}
