//! LLM interaction: one OpenAI-compatible chat-completion round-trip.
//!
//! The request carries the whole prompt as a single user message. Optional
//! sampling parameters are serialised only when configured. Exactly one
//! request is sent per call; there is no retry at this layer.
//!
//! Failures map onto four distinct [`SummaryError`] variants:
//!
//! | Failure | Variant |
//! |---------|---------|
//! | connect / DNS / timeout | `Transport` |
//! | non-2xx status, readable body or not | `HttpStatus` (with `detail` or `error.message` if present) |
//! | 2xx body unreadable or not JSON | `ResponseParse` |
//! | JSON without non-blank `choices[0].message.content` | `Protocol` |

use crate::config::SummaryConfig;
use crate::error::SummaryError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Anything that turns a prompt into response text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, SummaryError>;
}

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatCompletionRequest {
    /// Shape the request for `prompt` according to `config`.
    pub fn new(prompt: &str, config: &SummaryConfig) -> Self {
        Self {
            model: config.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt.to_string(),
            }],
            temperature: config.effective_temperature(),
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }
}

/// HTTP client for OpenAI-compatible chat-completion endpoints.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    config: SummaryConfig,
}

impl OpenAiClient {
    /// Create a client for the endpoint and model in `config`.
    pub fn new(config: &SummaryConfig) -> Result<Self, SummaryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| SummaryError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        // Normalised once here even if the config was assembled by hand.
        let base_url = config.base_url.trim_end_matches('/').to_string();

        info!(
            "Initializing OpenAI-compatible client: url={}, model={}",
            base_url, config.model_name
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, SummaryError> {
        let start = Instant::now();
        let request = ChatCompletionRequest::new(prompt, &self.config);
        debug!(
            "POST {} (model={}, prompt={} chars)",
            self.endpoint(),
            request.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummaryError::Transport {
                url: self.base_url.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} answered {}", self.base_url, status);
            // An unreadable error body only loses the detail.
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryError::HttpStatus {
                url: self.base_url.clone(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                detail: error_detail(&body),
            });
        }

        let body = response.text().await.map_err(|e| SummaryError::ResponseParse {
            url: self.base_url.clone(),
            detail: e.to_string(),
        })?;

        let content = parse_completion(&body, &self.base_url)?;
        debug!(
            "Completion received: {} chars in {:?}",
            content.chars().count(),
            start.elapsed()
        );
        Ok(content)
    }
}

/// Pull a human-readable reason out of an error body: `detail` first, then
/// `error.message`.
pub fn error_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let detail = json.get("detail").filter(|v| is_truthy(v));
    let message = json
        .get("error")
        .and_then(|e| e.get("message"))
        .filter(|v| is_truthy(v));
    detail.or(message).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// `null`, `false`, `0` and `""` carry no usable detail.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Validate a success body and return `choices[0].message.content`.
///
/// The content is returned untrimmed; only its blankness is checked.
pub fn parse_completion(body: &str, base_url: &str) -> Result<String, SummaryError> {
    let json: Value = serde_json::from_str(body).map_err(|e| SummaryError::ResponseParse {
        url: base_url.to_string(),
        detail: e.to_string(),
    })?;

    let first = match json.get("choices").and_then(Value::as_array) {
        Some(choices) if !choices.is_empty() => &choices[0],
        _ => {
            return Err(SummaryError::Protocol {
                detail: "missing choices.".into(),
            })
        }
    };

    match first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
    {
        Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
        _ => Err(SummaryError::Protocol {
            detail: "missing choices[0].message.content.".into(),
        }),
    }
}
