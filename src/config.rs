//! Configuration for a summarisation run.
//!
//! All behaviour is controlled through [`SummaryConfig`], built once via
//! [`SummaryConfigBuilder`] and passed by reference to every stage. Nothing
//! in the pipeline reads environment variables or other ambient state; the
//! CLI maps its flags onto the builder.
//!
//! Sampling parameters are optional on purpose: `None` means the field is
//! left out of the request entirely, not that a default is sent.

use crate::error::SummaryError;
use crate::progress::ProgressCallback;
use crate::prompts::{DEFAULT_HEADER_TEMPLATE, DEFAULT_INSTRUCTIONS};
use crate::template::render_header;
use std::fmt;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Temperature sent when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default HTTP timeout for the completion call.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;

/// Configuration for one summarisation run.
///
/// # Example
/// ```rust
/// use paper_digest::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .base_url("http://localhost:11434/v1/")
///     .model_name("qwen2.5:7b")
///     .max_tokens(2048)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "http://localhost:11434/v1");
/// assert_eq!(config.top_p, None);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// OpenAI-compatible base URL, without trailing slash.
    pub base_url: String,

    /// Model identifier sent in every request and shown in the header.
    pub model_name: String,

    /// Static bearer token, sent as `Authorization: Bearer {api_key}` even when empty.
    pub api_key: String,

    /// Note header; `{{modelName}}` is replaced with [`Self::model_name`].
    pub header_template: String,

    /// Opaque instruction block appended to the prompt skeleton.
    pub user_prompt_instructions: String,

    /// Overrides [`DEFAULT_TEMPERATURE`] when set.
    pub temperature: Option<f32>,

    /// Sent as `max_tokens` only when set.
    pub max_tokens: Option<u32>,

    /// Sent as `top_p` only when set.
    pub top_p: Option<f32>,

    /// Always generate, even if a note with the same header exists.
    pub skip_existing_check: bool,

    /// Timeout for the completion request in seconds.
    pub api_timeout_secs: u64,

    /// Receives stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            header_template: DEFAULT_HEADER_TEMPLATE.to_string(),
            user_prompt_instructions: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            skip_existing_check: false,
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("header_template", &self.header_template)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("skip_existing_check", &self.skip_existing_check)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SummaryProgressCallback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Header with the model name filled in; also the duplicate-detection prefix.
    pub fn header(&self) -> String {
        render_header(&self.header_template, &self.model_name)
    }

    /// Temperature actually sent.
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}

/// Builder for [`SummaryConfig`].
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl fmt::Debug for SummaryConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SummaryConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model_name(mut self, model: impl Into<String>) -> Self {
        self.config.model_name = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn header_template(mut self, template: impl Into<String>) -> Self {
        self.config.header_template = template.into();
        self
    }

    pub fn user_prompt_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.user_prompt_instructions = instructions.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = Some(p);
        self
    }

    pub fn skip_existing_check(mut self, v: bool) -> Self {
        self.config.skip_existing_check = v;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints and normalising the
    /// base URL.
    pub fn build(mut self) -> Result<SummaryConfig, SummaryError> {
        let c = &mut self.config;
        c.base_url = c.base_url.trim().trim_end_matches('/').to_string();
        if c.base_url.is_empty() {
            return Err(SummaryError::InvalidConfig("base URL must not be empty".into()));
        }
        if c.model_name.trim().is_empty() {
            return Err(SummaryError::InvalidConfig("model name must not be empty".into()));
        }
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(SummaryError::InvalidConfig(format!(
                    "temperature must be 0.0–2.0, got {t}"
                )));
            }
        }
        if let Some(p) = c.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(SummaryError::InvalidConfig(format!(
                    "top_p must be 0.0–1.0, got {p}"
                )));
            }
        }
        if c.max_tokens == Some(0) {
            return Err(SummaryError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(SummaryError::InvalidConfig("API timeout must be ≥ 1 second".into()));
        }
        Ok(self.config)
    }
}
