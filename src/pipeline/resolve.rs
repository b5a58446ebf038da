//! Target resolution: decide which attachment's text to summarise and
//! which item receives the note.
//!
//! Selecting a top-level record picks the **first** PDF/HTML attachment (in
//! the host's order) that yields non-blank text. Selecting an attachment
//! uses that attachment, attaching the note to its parent record when the
//! parent resolves and to the attachment itself otherwise.
//!
//! Extraction failures while scanning a record's attachments are treated as
//! "no text" and scanning continues; exhausting the list reports the
//! generic no-text error.

use crate::error::{InputError, SummaryError};
use crate::host::{Attachment, ItemRef, Library, Record, Selection};
use tracing::{debug, warn};

/// The attachment to summarise, its extracted text, and the note owner.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub attachment: Attachment,
    pub note_parent: ItemRef,
    /// Trimmed, never empty.
    pub fulltext: String,
}

/// Resolve `selection` into a [`ResolvedTarget`].
pub async fn resolve_target(
    selection: Option<&Selection>,
    library: &dyn Library,
) -> Result<ResolvedTarget, SummaryError> {
    match selection {
        None => Err(InputError::NoSelection.into()),
        Some(Selection::TopLevel(record)) => resolve_record(record, library).await,
        Some(Selection::Attachment(attachment)) => resolve_attachment(attachment, library).await,
        Some(Selection::Unsupported { kind }) => {
            debug!("Unsupported selection of kind '{}'", kind);
            Err(InputError::UnsupportedSelection.into())
        }
    }
}

async fn resolve_record(
    record: &Record,
    library: &dyn Library,
) -> Result<ResolvedTarget, SummaryError> {
    let ids = library.attachment_ids(record);
    if ids.is_empty() {
        return Err(InputError::NoAttachments.into());
    }

    for id in &ids {
        let Some(attachment) = library.attachment(id) else {
            debug!("Attachment {} does not resolve, skipping", id);
            continue;
        };
        if !attachment.content_type.is_supported() {
            debug!(
                "Attachment {} has unsupported type {:?}, skipping",
                id, attachment.content_type
            );
            continue;
        }
        let Some(fulltext) = extract_text(&attachment, library).await else {
            continue;
        };
        debug!("Using attachment {} ({} chars)", id, fulltext.chars().count());
        return Ok(ResolvedTarget {
            attachment,
            note_parent: record.item.clone(),
            fulltext,
        });
    }

    Err(InputError::NoExtractableText.into())
}

async fn resolve_attachment(
    attachment: &Attachment,
    library: &dyn Library,
) -> Result<ResolvedTarget, SummaryError> {
    if !attachment.content_type.is_supported() {
        return Err(InputError::UnsupportedAttachment.into());
    }

    let parent = attachment
        .parent_id
        .as_ref()
        .and_then(|id| library.record(id));

    let fulltext = extract_text(attachment, library)
        .await
        .ok_or(InputError::NotIndexed)?;

    let note_parent = match parent {
        Some(record) => record.item,
        None => attachment.item.clone(),
    };

    Ok(ResolvedTarget {
        attachment: attachment.clone(),
        note_parent,
        fulltext,
    })
}

/// Trimmed text of a supported attachment, or `None` when extraction fails
/// or yields only whitespace.
pub async fn extract_text(attachment: &Attachment, library: &dyn Library) -> Option<String> {
    if !attachment.content_type.is_supported() {
        return None;
    }
    match library.attachment_text(attachment).await {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                debug!("Attachment {} has no text", attachment.item.id);
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(e) => {
            warn!("Text extraction failed for {}: {}", attachment.item.id, e);
            None
        }
    }
}
