//! OpenAI-compatible chat-completions provider.
//!
//! Works against any endpoint implementing `POST {base_url}/chat/completions`
//! with bearer authentication (OpenAI, Azure-compatible gateways, local
//! servers). JSON output mode is requested through `response_format`.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    CompletionRequest, GenerationError, GenerationProvider, OutputMode, RetryPolicy,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::ProviderConfig;

/// [`GenerationProvider`] for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    config: ProviderConfig,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Creates a provider, reading the API key from `config.api_key_env`.
    pub fn from_env(config: ProviderConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            GenerationError::MissingCredentials {
                variable: config.api_key_env.clone(),
            }
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Creates a provider with an explicit API key.
    pub fn with_api_key(
        config: ProviderConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GenerationError::Transport {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.payload,
                },
            ],
            temperature: self.config.temperature,
            response_format: match request.mode {
                OutputMode::Json => Some(ResponseFormat {
                    kind: "json_object",
                }),
                OutputMode::Text => None,
            },
        }
    }

    async fn attempt(&self, body: &ChatRequest<'_>) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::malformed(format!("unreadable chat-completions response: {e}"))
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    #[instrument(skip_all, fields(stage = %request.stage, model = %self.config.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let body = self.body(&request);
        let mut attempt = 0;
        loop {
            match self.attempt(&body).await {
                Ok(content) => {
                    debug!(attempt, bytes = content.len(), "completion received");
                    return Ok(content);
                }
                Err(error) => {
                    let delay = match error.retry_policy() {
                        RetryPolicy::Retryable { after } if attempt < self.config.max_retries => {
                            after
                                .map(|after| after.min(self.config.max_backoff()))
                                .unwrap_or_else(|| self.config.backoff(attempt))
                        }
                        _ => return Err(error),
                    };
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying completion"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
