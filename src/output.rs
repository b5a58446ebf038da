//! Result types returned by [`crate::summarize::summarize`].

use crate::host::ItemId;
use serde::Serialize;

/// Header and rendered body of a generated note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotePayload {
    /// Unrendered header; also the duplicate-detection prefix.
    pub header: String,
    pub body_html: String,
}

impl NotePayload {
    /// Note content as stored by the host: header, newline, body.
    pub fn content(&self) -> String {
        format!("{}\n{}", self.header, self.body_html)
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryOutcome {
    /// A new note was written.
    Created {
        note_id: ItemId,
        parent_id: ItemId,
        title: String,
        /// Characters of extracted text sent to the model.
        text_chars: usize,
        /// Whether the preformatted fallback replaced the Markdown renderer.
        fallback_render: bool,
        content: String,
    },
    /// A note starting with the same header already exists; the model was
    /// not called.
    AlreadyExists { note_id: ItemId, parent_id: ItemId },
}

impl SummaryOutcome {
    pub fn note_id(&self) -> &ItemId {
        match self {
            SummaryOutcome::Created { note_id, .. } | SummaryOutcome::AlreadyExists { note_id, .. } => {
                note_id
            }
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SummaryOutcome::Created { .. })
    }
}
