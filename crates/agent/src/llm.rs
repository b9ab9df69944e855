use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use concierge_core::config::{LlmConfig, LlmProvider};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm returned status {0}")]
    Status(u16),
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm client is misconfigured: {0}")]
    Configuration(String),
}

/// Pluggable completion seam. Implementations must be safe to share across
/// request tasks.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// HTTP-backed client for OpenAI-compatible, Anthropic, and Ollama endpoints.
/// A failed call is retried up to `max_retries` times with a short delay;
/// callers are expected to have a deterministic fallback regardless.
pub struct HttpLlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| LlmError::Configuration(err.to_string()))?;
        Ok(Self { client, config })
    }

    async fn complete_once(&self, system: &str, user: &str) -> Result<String, LlmError> {
        match self.config.provider {
            LlmProvider::OpenAi => self.complete_openai(system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
            LlmProvider::Ollama => self.complete_ollama(system, user).await,
        }
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let base_url =
            self.config.base_url.clone().unwrap_or_else(|| "https://api.openai.com".to_string());
        let api_key = self.api_key()?;

        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .client
            .post(format!("{base_url}/v1/chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let payload = decode_json(response).await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("missing choices[0].message.content".to_string()))
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let base_url =
            self.config.base_url.clone().unwrap_or_else(|| "https://api.anthropic.com".to_string());
        let api_key = self.api_key()?;

        let body = json!({
            "model": self.config.model,
            "max_tokens": 1024,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });

        let response = self
            .client
            .post(format!("{base_url}/v1/messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let payload = decode_json(response).await?;
        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("missing content[0].text".to_string()))
    }

    async fn complete_ollama(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let base_url = self
            .config
            .base_url
            .clone()
            .ok_or_else(|| LlmError::Configuration("ollama requires base_url".to_string()))?;

        let body = json!({
            "model": self.config.model,
            "stream": false,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .client
            .post(format!("{base_url}/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let payload = decode_json(response).await?;
        payload["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("missing message.content".to_string()))
    }

    fn api_key(&self) -> Result<String, LlmError> {
        self.config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().to_string())
            .ok_or_else(|| LlmError::Configuration("api_key is not configured".to_string()))
    }
}

async fn decode_json(response: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = response.status();
    if !status.is_success() {
        return Err(LlmError::Status(status.as_u16()));
    }
    response.json().await.map_err(|err| LlmError::Decode(err.to_string()))
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.complete_once(system, user).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "llm.retry",
                        attempt,
                        error = %err,
                        "llm call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        (**self).complete(system, user).await
    }
}

/// Replays a fixed queue of responses; errors once exhausted.
#[derive(Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| LlmError::Transport("scripted responses poisoned".to_string()))?;
        responses
            .pop_front()
            .ok_or_else(|| LlmError::Transport("scripted responses exhausted".to_string()))
    }
}

/// Fails every call; exercises the deterministic fallbacks.
pub struct FailingLlmClient;

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::Transport("model endpoint unreachable".to_string()))
    }
}
