//! A file-backed [`Library`] for running the pipeline outside a host
//! application.
//!
//! The library is a JSON manifest:
//!
//! ```json
//! {
//!   "libraryId": 1,
//!   "items": [
//!     { "key": "R1", "itemType": "journalArticle", "title": "Attention Is All You Need" },
//!     { "key": "A1", "itemType": "attachment", "parentKey": "R1",
//!       "contentType": "application/pdf", "textPath": "R1/fulltext.txt" },
//!     { "key": "N1", "itemType": "note", "parentKey": "R1", "note": "<p>Read later</p>" }
//!   ]
//! }
//! ```
//!
//! Attachment text is supplied already extracted, either inline (`text`) or
//! as a file relative to the manifest (`textPath`). Item order in the
//! manifest is the order attachments and notes are listed in.
//!
//! New notes are appended and, for a file-backed library, the manifest is
//! rewritten atomically (temp file + rename) so a crash never leaves a
//! truncated library behind.

use crate::host::{Attachment, ContentType, HostError, ItemId, ItemRef, Library, NewNote, Record, Selection};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const ATTACHMENT: &str = "attachment";
const NOTE: &str = "note";

/// One item of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredItem {
    pub key: String,
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    /// MIME type of an attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Inline extracted text of an attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Extracted text file, relative to the manifest directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_path: Option<PathBuf>,
    /// HTML content of a note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default = "default_library_id")]
    library_id: u32,
    #[serde(default)]
    items: Vec<StoredItem>,
}

fn default_library_id() -> u32 {
    1
}

/// JSON-manifest library.
pub struct JsonLibrary {
    /// Manifest location; `None` keeps everything in memory.
    path: Option<PathBuf>,
    base_dir: PathBuf,
    library_id: u32,
    items: Mutex<Vec<StoredItem>>,
}

impl JsonLibrary {
    /// Load a manifest from disk.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| HostError(format!("failed to read library '{}': {e}", path.display())))?;
        let manifest: Manifest = serde_json::from_str(&raw)
            .map_err(|e| HostError(format!("invalid library '{}': {e}", path.display())))?;

        info!(
            "Loaded library {} from {} ({} items)",
            manifest.library_id,
            path.display(),
            manifest.items.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            library_id: manifest.library_id,
            items: Mutex::new(manifest.items),
        })
    }

    /// A library that lives only in memory; notes are never written out.
    pub fn in_memory(library_id: u32, items: Vec<StoredItem>) -> Self {
        Self {
            path: None,
            base_dir: PathBuf::new(),
            library_id,
            items: Mutex::new(items),
        }
    }

    pub fn library_id(&self) -> u32 {
        self.library_id
    }

    /// Snapshot of all items in manifest order.
    pub fn items(&self) -> Vec<StoredItem> {
        self.lock().clone()
    }

    /// Classify the item `id` as a selection; `None` if it does not exist.
    pub fn selection(&self, id: &ItemId) -> Option<Selection> {
        let items = self.lock();
        let item = items.iter().find(|i| i.key == id.0)?;
        let selection = match item.item_type.as_str() {
            ATTACHMENT => Selection::Attachment(self.to_attachment(item)),
            NOTE => Selection::Unsupported { kind: NOTE.into() },
            _ if item.parent_key.is_none() => Selection::TopLevel(Record {
                item: self.item_ref(&item.key),
            }),
            other => Selection::Unsupported {
                kind: format!("child {other}"),
            },
        };
        Some(selection)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn item_ref(&self, key: &str) -> ItemRef {
        ItemRef {
            id: ItemId::new(key),
            library_id: self.library_id,
        }
    }

    fn to_attachment(&self, item: &StoredItem) -> Attachment {
        Attachment {
            item: self.item_ref(&item.key),
            content_type: ContentType::from_mime(item.content_type.as_deref().unwrap_or("")),
            parent_id: item.parent_key.as_deref().map(ItemId::new),
        }
    }

    fn next_note_key(items: &[StoredItem]) -> String {
        let mut n = items.len() + 1;
        loop {
            let key = format!("N{n:07}");
            if !items.iter().any(|i| i.key == key) {
                return key;
            }
            n += 1;
        }
    }

    async fn persist(&self, path: &Path, items: Vec<StoredItem>) -> Result<(), HostError> {
        let manifest = Manifest {
            library_id: self.library_id,
            items,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| HostError(format!("failed to serialise library: {e}")))?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| HostError(format!("failed to write '{}': {e}", tmp_path.display())))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| HostError(format!("failed to replace '{}': {e}", path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl Library for JsonLibrary {
    fn attachment_ids(&self, record: &Record) -> Vec<ItemId> {
        self.lock()
            .iter()
            .filter(|i| i.item_type == ATTACHMENT && i.parent_key.as_deref() == Some(record.item.id.as_str()))
            .map(|i| ItemId::new(i.key.clone()))
            .collect()
    }

    fn attachment(&self, id: &ItemId) -> Option<Attachment> {
        let items = self.lock();
        items
            .iter()
            .find(|i| i.key == id.0 && i.item_type == ATTACHMENT)
            .map(|i| self.to_attachment(i))
    }

    fn record(&self, id: &ItemId) -> Option<Record> {
        let items = self.lock();
        items
            .iter()
            .find(|i| i.key == id.0 && i.item_type != ATTACHMENT && i.item_type != NOTE)
            .map(|i| Record {
                item: self.item_ref(&i.key),
            })
    }

    async fn attachment_text(&self, attachment: &Attachment) -> Result<String, HostError> {
        let (text, text_path) = {
            let items = self.lock();
            let item = items
                .iter()
                .find(|i| i.key == attachment.item.id.0)
                .ok_or_else(|| HostError(format!("attachment {} not found", attachment.item.id)))?;
            (item.text.clone(), item.text_path.clone())
        };

        if let Some(text) = text {
            return Ok(text);
        }
        match text_path {
            Some(rel) => {
                let full = self.base_dir.join(rel);
                debug!("Reading extracted text from {}", full.display());
                tokio::fs::read_to_string(&full)
                    .await
                    .map_err(|e| HostError(format!("failed to read '{}': {e}", full.display())))
            }
            None => Ok(String::new()),
        }
    }

    fn field(&self, item: &ItemRef, name: &str) -> Option<String> {
        let items = self.lock();
        let stored = items.iter().find(|i| i.key == item.id.0)?;
        match name {
            "title" => stored.title.clone(),
            "itemType" => Some(stored.item_type.clone()),
            "contentType" => stored.content_type.clone(),
            _ => None,
        }
    }

    fn note_ids(&self, parent: &ItemRef) -> Vec<ItemId> {
        self.lock()
            .iter()
            .filter(|i| i.item_type == NOTE && i.parent_key.as_deref() == Some(parent.id.as_str()))
            .map(|i| ItemId::new(i.key.clone()))
            .collect()
    }

    fn note_content(&self, id: &ItemId) -> Option<String> {
        self.lock()
            .iter()
            .find(|i| i.key == id.0 && i.item_type == NOTE)
            .map(|i| i.note.clone().unwrap_or_default())
    }

    async fn save_note(&self, note: NewNote) -> Result<ItemId, HostError> {
        if note.parent.library_id != self.library_id {
            return Err(HostError(format!(
                "parent {} belongs to library {}, not {}",
                note.parent.id, note.parent.library_id, self.library_id
            )));
        }

        let (stored, snapshot) = {
            let items = self.lock();
            let stored = StoredItem {
                key: Self::next_note_key(&items),
                item_type: NOTE.into(),
                parent_key: Some(note.parent.id.0.clone()),
                note: Some(note.content),
                ..StoredItem::default()
            };
            let snapshot = self.path.as_ref().map(|_| {
                let mut all = items.clone();
                all.push(stored.clone());
                all
            });
            (stored, snapshot)
        };

        if let (Some(path), Some(all)) = (self.path.as_deref(), snapshot) {
            self.persist(path, all).await?;
        }

        let id = ItemId::new(stored.key.clone());
        self.lock().push(stored);
        info!("Saved note {} under {}", id, note.parent.id);
        Ok(id)
    }
}
