//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves from stage to stage. The library never
//! talks to a UI directly; a presentation adapter (the CLI spinner, a host
//! progress window) subscribes here.
//!
//! # Example
//!
//! ```rust
//! use paper_digest::{Stage, SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl SummaryProgressCallback for StageLog {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(Arc::new(StageLog::default()))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResolveTarget,
    CheckDuplicate,
    ValidateTextLength,
    BuildPrompt,
    CallLlm,
    RenderHtml,
    PersistNote,
}

impl Stage {
    /// Progress percentage shown while this stage runs.
    pub fn percent(self) -> u8 {
        match self {
            Stage::ResolveTarget => 0,
            Stage::CheckDuplicate | Stage::ValidateTextLength => 20,
            Stage::BuildPrompt | Stage::CallLlm => 50,
            Stage::RenderHtml | Stage::PersistNote => 80,
        }
    }

    /// Status line for this stage.
    pub fn label(self) -> &'static str {
        match self {
            Stage::ResolveTarget => "Locating attachment text...",
            Stage::CheckDuplicate => "Checking for an existing summary...",
            Stage::ValidateTextLength => "Extracting PDF text...",
            Stage::BuildPrompt => "Preparing prompt...",
            Stage::CallLlm => "Generating summary...",
            Stage::RenderHtml => "Formatting summary...",
            Stage::PersistNote => "Creating note...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the pipeline as it advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Exactly one of `on_already_exists`, `on_complete`
/// or `on_error` ends every run.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called once the target is resolved and a title is known.
    ///
    /// # Arguments
    /// * `short_title`: title cut to 50 characters (plus `...`)
    fn on_start(&self, short_title: &str) {
        let _ = short_title;
    }

    /// Called when the pipeline enters `stage`.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a note with the same header already exists.
    fn on_already_exists(&self) {}

    /// Called after the note was persisted.
    fn on_complete(&self, note_id: &str) {
        let _ = note_id;
    }

    /// Called when the pipeline aborts.
    ///
    /// # Arguments
    /// * `message`: `"Error: "`-prefixed text for the user
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
