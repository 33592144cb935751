//! Groq provider implementation.
//!
//! Uses the OpenAI-compatible chat completions API with Groq's base URL.

use crate::{
    error::ProviderError, message::Message, GenerateOptions, LanguageModel, ProviderResult,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Groq's OpenAI-compatible API base.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "llama-3.1-70b";

/// Upper bound on a single completion request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Groq provider configuration.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API base URL, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl GroqConfig {
    /// Configuration with the default model, base URL and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Groq chat-completion client.
pub struct GroqProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GroqProvider {
    /// Create a new Groq provider.
    pub fn new(config: GroqConfig) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::missing_api_key("groq (GROQ_API_KEY)"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| ProviderError::invalid_api_key("groq"))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::internal(e.to_string()))?;

        debug!(model = %config.model, base_url = %config.base_url, "Creating Groq provider");

        Ok(Self {
            client,
            model: config.model,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for GroqProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        options: GenerateOptions,
    ) -> ProviderResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            temperature: options.temperature,
        };

        debug!(
            model = %self.model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        info!(status = %status, "Groq API response received");

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Groq request failed");

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited { retry_after });
            }
            if status.as_u16() == 401 {
                return Err(ProviderError::invalid_api_key("groq"));
            }
            return Err(ProviderError::api_error(status.as_u16(), error_message(&body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::invalid_response("response has no message content"))?;

        debug!(chars = content.len(), "Completion received");
        Ok(content)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn provider_id(&self) -> &str {
        "groq"
    }
}

impl GroqProvider {
    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::RequestFailed(e)
        }
    }
}

/// Pull `error.message` out of an OpenAI-style error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.message)
        .unwrap_or_else(|| body.to_string())
}

// Request/response types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
