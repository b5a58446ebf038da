//! The narrow interface the pipeline needs from a reference-library host.
//!
//! The host owns items, attachments, notes and their persistence. The
//! pipeline never mutates an attachment; its only write is
//! [`Library::save_note`], issued at the very end of a successful run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a library item (record, attachment or note).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An item together with the library it lives in. New notes inherit the
/// library of their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ItemId,
    pub library_id: u32,
}

/// Attachment content type, as far as text extraction is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Pdf,
    Html,
    Other(String),
}

impl ContentType {
    /// Classify a MIME type string.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "application/pdf" => ContentType::Pdf,
            "text/html" => ContentType::Html,
            other => ContentType::Other(other.to_string()),
        }
    }

    /// Only PDF and HTML attachments carry extractable full text.
    pub fn is_supported(&self) -> bool {
        matches!(self, ContentType::Pdf | ContentType::Html)
    }
}

/// A top-level bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub item: ItemRef,
}

/// A file linked to a record (or standalone).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub item: ItemRef,
    pub content_type: ContentType,
    pub parent_id: Option<ItemId>,
}

/// What the user picked, classified once at entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    TopLevel(Record),
    Attachment(Attachment),
    /// Anything else the host lets the user select (notes, child records, ...).
    Unsupported { kind: String },
}

/// Content and placement of a note about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub parent: ItemRef,
    pub content: String,
}

/// Failure reported by the host. Extraction failures are usually swallowed
/// by the resolver; everything else aborts the pipeline.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl From<HostError> for crate::error::SummaryError {
    fn from(e: HostError) -> Self {
        crate::error::SummaryError::Host(e.0)
    }
}

/// Host capabilities consumed by the pipeline.
#[async_trait]
pub trait Library: Send + Sync {
    /// Attachment identifiers of a record, in the host's order.
    fn attachment_ids(&self, record: &Record) -> Vec<ItemId>;

    /// Look up an attachment; `None` if the id is unknown or not an attachment.
    fn attachment(&self, id: &ItemId) -> Option<Attachment>;

    /// Look up a record by id.
    fn record(&self, id: &ItemId) -> Option<Record>;

    /// Extract the attachment's full text. May fail or return blank text.
    async fn attachment_text(&self, attachment: &Attachment) -> Result<String, HostError>;

    /// Read a text field such as `"title"`.
    fn field(&self, item: &ItemRef, name: &str) -> Option<String>;

    /// Child note identifiers of an item.
    fn note_ids(&self, parent: &ItemRef) -> Vec<ItemId>;

    /// Content of a note, `None` if the id does not resolve to a note.
    fn note_content(&self, id: &ItemId) -> Option<String>;

    /// Create and persist a note, returning its id.
    async fn save_note(&self, note: NewNote) -> Result<ItemId, HostError>;
}
