//! The summarisation pipeline: selection in, note out.
//!
//! ```text
//! ResolveTarget ─▶ CheckDuplicate ─▶ ValidateTextLength ─▶ BuildPrompt
//!       ─▶ CallLlm ─▶ RenderHtml ─▶ PersistNote ─▶ Done
//!                 └─▶ AlreadyExists (no LLM call)
//! ```
//!
//! Every stage is gated on the previous one; the first error aborts the
//! run. The note is written in the last stage only, so a failed run leaves
//! nothing behind. Duplicate check then create is not atomic: two runs on
//! the same record at the same time can both create a note.

use crate::config::SummaryConfig;
use crate::error::{InputError, SummaryError};
use crate::host::{ItemId, ItemRef, Library, NewNote, Selection};
use crate::output::{NotePayload, SummaryOutcome};
use crate::pipeline::llm::CompletionClient;
use crate::pipeline::render::{render_markdown, render_preformatted};
use crate::pipeline::resolve::{resolve_target, ResolvedTarget};
use crate::progress::Stage;
use crate::prompts::{build_prompt, UNTITLED};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extracted text shorter than this is rejected.
pub const MIN_TEXT_CHARS: usize = 100;

/// Titles longer than this are shortened on the progress surface.
pub const SHORT_TITLE_CHARS: usize = 50;

/// Run the pipeline for `selection`.
///
/// # Returns
/// `Ok(SummaryOutcome::Created)` after the note is persisted, or
/// `Ok(SummaryOutcome::AlreadyExists)` when an equivalent note is found.
///
/// # Errors
/// Any [`SummaryError`]; the progress callback receives the same error as
/// an `"Error: "`-prefixed message before it is returned.
pub async fn summarize(
    selection: Option<&Selection>,
    library: &dyn Library,
    llm: &dyn CompletionClient,
    config: &SummaryConfig,
) -> Result<SummaryOutcome, SummaryError> {
    let start = Instant::now();
    let result = run(selection, library, llm, config).await;

    match &result {
        Ok(outcome) => {
            info!(
                "Summary run finished in {}ms: {}",
                start.elapsed().as_millis(),
                if outcome.is_created() { "note created" } else { "already exists" }
            );
        }
        Err(e) => {
            warn!("Summary run failed: {}", e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_error(&e.user_message());
            }
        }
    }
    result
}

async fn run(
    selection: Option<&Selection>,
    library: &dyn Library,
    llm: &dyn CompletionClient,
    config: &SummaryConfig,
) -> Result<SummaryOutcome, SummaryError> {
    let cb = config.progress_callback.as_ref();
    let stage = |s: Stage| {
        debug!("Stage: {:?}", s);
        if let Some(cb) = cb {
            cb.on_stage(s);
        }
    };

    // ── ResolveTarget ────────────────────────────────────────────────────
    stage(Stage::ResolveTarget);
    let target = resolve_target(selection, library).await?;
    let title = resolve_title(&target, library);
    if let Some(cb) = cb {
        cb.on_start(&short_title(&title));
    }

    // ── CheckDuplicate ───────────────────────────────────────────────────
    let header = config.header();
    if !config.skip_existing_check {
        stage(Stage::CheckDuplicate);
        if let Some(note_id) = find_existing_summary(library, &target.note_parent, &header) {
            info!("Summary already exists: note {}", note_id);
            if let Some(cb) = cb {
                cb.on_already_exists();
            }
            return Ok(SummaryOutcome::AlreadyExists {
                note_id,
                parent_id: target.note_parent.id,
            });
        }
    }

    // ── ValidateTextLength ───────────────────────────────────────────────
    stage(Stage::ValidateTextLength);
    let text_chars = validate_text_length(&target.fulltext)?;

    // ── BuildPrompt ──────────────────────────────────────────────────────
    stage(Stage::BuildPrompt);
    let prompt = build_prompt(&config.user_prompt_instructions, &title, &target.fulltext);

    // ── CallLlm ──────────────────────────────────────────────────────────
    stage(Stage::CallLlm);
    let llm_start = Instant::now();
    let summary_text = llm.complete(&prompt).await?;
    info!(
        "Model {} answered in {}ms ({} chars)",
        config.model_name,
        llm_start.elapsed().as_millis(),
        summary_text.chars().count()
    );

    // ── RenderHtml ───────────────────────────────────────────────────────
    stage(Stage::RenderHtml);
    let (body_html, fallback_render) = match render_markdown(&summary_text) {
        Ok(html) => (html, false),
        Err(e) => {
            warn!("Rendering failed, falling back to preformatted text: {}", e);
            (render_preformatted(&summary_text), true)
        }
    };
    let payload = NotePayload { header, body_html };

    // ── PersistNote ──────────────────────────────────────────────────────
    stage(Stage::PersistNote);
    let content = payload.content();
    let note_id = library
        .save_note(NewNote {
            parent: target.note_parent.clone(),
            content: content.clone(),
        })
        .await?;
    if let Some(cb) = cb {
        cb.on_complete(note_id.as_str());
    }

    Ok(SummaryOutcome::Created {
        note_id,
        parent_id: target.note_parent.id,
        title,
        text_chars,
        fallback_render,
        content,
    })
}

/// First note under `parent` whose content starts with `header`.
pub fn find_existing_summary(library: &dyn Library, parent: &ItemRef, header: &str) -> Option<ItemId> {
    library.note_ids(parent).into_iter().find(|id| {
        library
            .note_content(id)
            .is_some_and(|content| content.starts_with(header))
    })
}

/// Reject empty or too-short text; returns the character count.
pub fn validate_text_length(fulltext: &str) -> Result<usize, InputError> {
    let trimmed = fulltext.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyText);
    }
    let chars = trimmed.chars().count();
    if chars < MIN_TEXT_CHARS {
        return Err(InputError::TextTooShort { chars });
    }
    Ok(chars)
}

/// Title of the note parent, else of the attachment, else [`UNTITLED`].
fn resolve_title(target: &ResolvedTarget, library: &dyn Library) -> String {
    [&target.note_parent, &target.attachment.item]
        .into_iter()
        .filter_map(|item| library.field(item, "title"))
        .find(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Cut `title` to [`SHORT_TITLE_CHARS`] characters plus `...`.
pub fn short_title(title: &str) -> String {
    if title.chars().count() > SHORT_TITLE_CHARS {
        let cut: String = title.chars().take(SHORT_TITLE_CHARS).collect();
        format!("{cut}...")
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_titles_are_kept() {
        assert_eq!(short_title("Attention Is All You Need"), "Attention Is All You Need");
        let fifty = "x".repeat(50);
        assert_eq!(short_title(&fifty), fifty);
    }

    #[test]
    fn long_titles_are_cut_on_char_boundaries() {
        let long = "é".repeat(60);
        let short = short_title(&long);
        assert_eq!(short.chars().count(), 53);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn text_length_floor() {
        assert_eq!(validate_text_length("   "), Err(InputError::EmptyText));
        assert_eq!(
            validate_text_length(&"a".repeat(99)),
            Err(InputError::TextTooShort { chars: 99 })
        );
        assert_eq!(validate_text_length(&"a".repeat(100)), Ok(100));
    }

    #[test]
    fn text_length_counts_trimmed_characters() {
        let padded = format!("   {}   ", "b".repeat(42));
        assert_eq!(
            validate_text_length(&padded),
            Err(InputError::TextTooShort { chars: 42 })
        );
    }
}
