use std::time::Duration;

use async_trait::async_trait;
use pitchcraft_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::LlmError;

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), temperature: 0.7, max_tokens: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Text generation endpoint used by the generator tools. Prompt in, text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}

/// Client for `POST {base_url}/v1/chat/completions`. Both OpenAI and Ollama
/// serve this route.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| LlmError::Http(format!("failed to build http client: {error}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            timeout_secs,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(&config.base_url, &config.model, config.api_key.clone(), config.timeout_secs)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn map_send_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Http(error.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let mut http_request = self.client.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key.expose_secret());
        }

        tracing::debug!(
            event_name = "llm.request.sent",
            model = %self.model,
            prompt_chars = request.prompt.chars().count(),
            "sending completion request"
        );

        let response = http_request.send().await.map_err(|error| self.map_send_error(error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let payload: Value = response.json().await.map_err(|error| {
            if error.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::InvalidJson(error.to_string())
            }
        })?;

        parse_chat_completion(&payload, &self.model)
    }
}

fn parse_chat_completion(payload: &Value, fallback_model: &str) -> Result<Completion, LlmError> {
    let text = payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or(LlmError::EmptyResponse)?;

    let model = payload.get("model").and_then(Value::as_str).unwrap_or(fallback_model).to_string();

    let usage = payload.get("usage").map(|usage| {
        let count = |key: &str| usage.get(key).and_then(Value::as_u64).unwrap_or(0) as u32;
        TokenUsage {
            input_tokens: count("prompt_tokens"),
            output_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
        }
    });

    Ok(Completion { text: text.to_string(), model, usage })
}
