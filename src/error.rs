//! Error types for the paper-digest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SummaryError`]: **Fatal**: the pipeline cannot produce a note
//!   (nothing selected, no usable text, the LLM call failed, the host
//!   refused to save). Returned as `Err(SummaryError)` from
//!   [`crate::summarize::summarize`]; no note is written.
//!
//! * [`RenderError`]: **Non-fatal**: the Markdown renderer gave up on the
//!   model's response. The orchestrator catches it and falls back to a
//!   preformatted block, so it never reaches the caller.

use thiserror::Error;

/// User-actionable input failures. Retrying without changing the
/// selection (or waiting for the host to index the file) will not help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("No item selected.")]
    NoSelection,

    #[error("No attachments found on the selected item.")]
    NoAttachments,

    #[error("No extractable text found in any PDF/HTML attachment of the selected item.")]
    NoExtractableText,

    /// A directly selected attachment is neither PDF nor HTML.
    #[error("Unsupported attachment type. Please select a PDF/HTML attachment or a top-level regular item.")]
    UnsupportedAttachment,

    /// A directly selected attachment produced no text.
    #[error("No extractable text found in the selected attachment. It may not be indexed yet.")]
    NotIndexed,

    #[error("Unsupported selection. Please select a top-level regular item or a PDF/HTML attachment.")]
    UnsupportedSelection,

    #[error("No PDF text found. The PDF may not have been indexed yet. Please wait a few minutes and try again.")]
    EmptyText,

    #[error("Extracted text is too short ({chars} characters). The PDF may not have been properly indexed yet. Please wait a few minutes and try again.")]
    TextTooShort { chars: usize },
}

/// All fatal errors returned by the paper-digest library.
#[derive(Debug, Error)]
pub enum SummaryError {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error(transparent)]
    Input(#[from] InputError),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The HTTP request could not be completed (DNS, connect, timeout).
    #[error("Network error while calling {url}: {detail}")]
    Transport { url: String, detail: String },

    /// The server answered outside the 2xx range.
    #[error("{url} HTTP Error: {status} {status_text}{}", detail_suffix(.detail))]
    HttpStatus {
        url: String,
        status: u16,
        status_text: String,
        detail: Option<String>,
    },

    /// The response body is not valid JSON.
    #[error("Error when parsing json of {url}/chat/completions: {detail}")]
    ResponseParse { url: String, detail: String },

    /// Valid JSON without a usable `choices[0].message.content`.
    #[error("Invalid LLM response: {detail}")]
    Protocol { detail: String },

    // ── Host errors ───────────────────────────────────────────────────────
    /// The host library failed to read or persist an item.
    #[error("Library error: {0}")]
    Host(String),

    // ── Config errors ─────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SummaryError {
    /// Text shown on the status surface when the pipeline aborts.
    pub fn user_message(&self) -> String {
        format!("Error: {self}")
    }

    /// True for failures the user fixes by changing the selection or waiting.
    pub fn is_input(&self) -> bool {
        matches!(self, SummaryError::Input(_))
    }

    /// True for failures of the single LLM round-trip.
    pub fn is_llm(&self) -> bool {
        matches!(
            self,
            SummaryError::Transport { .. }
                | SummaryError::HttpStatus { .. }
                | SummaryError::ResponseParse { .. }
                | SummaryError::Protocol { .. }
        )
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" - {d}"))
        .unwrap_or_default()
}

/// Non-fatal failure of the Markdown renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write rendered HTML: {0}")]
    Format(#[from] std::fmt::Error),
}
