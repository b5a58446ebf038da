//! Integration tests for the summarisation pipeline.
//!
//! The library is an in-memory `JsonLibrary` and the model is a scripted
//! `CompletionClient`, so these run offline and deterministically.

use async_trait::async_trait;
use paper_digest::{
    summarize, InputError, ItemId, JsonLibrary, Library, ProgressCallback, Stage, StoredItem,
    SummaryConfig, SummaryError, SummaryOutcome, SummaryProgressCallback,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const HEADER: &str = "<h2>AI Generated Summary (test-model)</h2>";

/// Answers every prompt with the same text and records what it was asked.
struct ScriptedClient {
    reply: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(detail: &str) -> Self {
        Self {
            reply: Err(detail.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl paper_digest::CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(|detail| SummaryError::Transport {
            url: "http://llm.test/v1".into(),
            detail,
        })
    }
}

/// Records every progress event as a string.
#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl SummaryProgressCallback for RecordingCallback {
    fn on_start(&self, short_title: &str) {
        self.push(format!("start:{short_title}"));
    }
    fn on_stage(&self, stage: Stage) {
        self.push(format!("stage:{:?}:{}", stage, stage.percent()));
    }
    fn on_already_exists(&self) {
        self.push("exists".into());
    }
    fn on_complete(&self, note_id: &str) {
        self.push(format!("complete:{note_id}"));
    }
    fn on_error(&self, message: &str) {
        self.push(format!("error:{message}"));
    }
}

fn record(key: &str, title: Option<&str>) -> StoredItem {
    StoredItem {
        key: key.into(),
        item_type: "journalArticle".into(),
        title: title.map(String::from),
        ..StoredItem::default()
    }
}

fn attachment(key: &str, parent: Option<&str>, mime: &str, text: Option<&str>) -> StoredItem {
    StoredItem {
        key: key.into(),
        item_type: "attachment".into(),
        parent_key: parent.map(String::from),
        content_type: Some(mime.into()),
        text: text.map(String::from),
        ..StoredItem::default()
    }
}

fn note(key: &str, parent: &str, content: &str) -> StoredItem {
    StoredItem {
        key: key.into(),
        item_type: "note".into(),
        parent_key: Some(parent.into()),
        note: Some(content.into()),
        ..StoredItem::default()
    }
}

fn config() -> SummaryConfig {
    SummaryConfig::builder().model_name("test-model").build().unwrap()
}

fn config_with(cb: ProgressCallback) -> SummaryConfig {
    SummaryConfig::builder()
        .model_name("test-model")
        .progress_callback(cb)
        .build()
        .unwrap()
}

fn notes_under(lib: &JsonLibrary, parent: &str) -> Vec<StoredItem> {
    lib.items()
        .into_iter()
        .filter(|i| i.item_type == "note" && i.parent_key.as_deref() == Some(parent))
        .collect()
}

fn paper_text() -> String {
    "x".repeat(500)
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_with_pdf_produces_rendered_note() {
    let text = paper_text();
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("A Paper")),
            attachment("A1", Some("R1"), "application/pdf", Some(&text)),
        ],
    );
    let llm = ScriptedClient::answering("**A**\n- b\n- c");
    let selection = lib.selection(&ItemId::new("R1"));

    let outcome = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    let expected = format!(
        "{HEADER}\n<p><strong>A</strong></p>\n<ul>\n<li>b</li>\n<li>c</li>\n</ul>"
    );
    let notes = notes_under(&lib, "R1");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].note.as_deref(), Some(expected.as_str()));

    match outcome {
        SummaryOutcome::Created {
            note_id,
            parent_id,
            title,
            text_chars,
            fallback_render,
            content,
        } => {
            assert_eq!(note_id.as_str(), notes[0].key);
            assert_eq!(parent_id, ItemId::new("R1"));
            assert_eq!(title, "A Paper");
            assert_eq!(text_chars, 500);
            assert!(!fallback_render);
            assert_eq!(content, expected);
        }
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn prompt_carries_title_and_text() {
    let text = format!("Transformers replace recurrence. {}", paper_text());
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("Attention Is All You Need")),
            attachment("A1", Some("R1"), "application/pdf", Some(&text)),
        ],
    );
    let llm = ScriptedClient::answering("ok");
    let selection = lib.selection(&ItemId::new("R1"));
    summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("titled \"Attention Is All You Need\""));
    assert!(prompts[0].contains("--- START OF PAPER ---\nTransformers replace recurrence."));
    assert!(!prompts[0].contains("{title}"));
    assert!(!prompts[0].contains("{text}"));
}

#[tokio::test]
async fn first_attachment_with_text_wins() {
    let text = paper_text();
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A0", Some("R1"), "image/png", Some("ignored image text")),
            attachment("A1", Some("R1"), "application/pdf", None),
            attachment("A2", Some("R1"), "text/html", Some(&text)),
            attachment("A3", Some("R1"), "application/pdf", Some("never read")),
        ],
    );
    let llm = ScriptedClient::answering("Summary");
    let selection = lib.selection(&ItemId::new("R1"));
    summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains(&text));
    assert!(!prompts[0].contains("never read"));
}

#[tokio::test]
async fn child_attachment_note_goes_to_parent_record() {
    let text = paper_text();
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("Parent Title")),
            attachment("A1", Some("R1"), "application/pdf", Some(&text)),
        ],
    );
    let llm = ScriptedClient::answering("Done.");
    let selection = lib.selection(&ItemId::new("A1"));
    let outcome = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    assert_eq!(notes_under(&lib, "R1").len(), 1);
    match outcome {
        SummaryOutcome::Created { parent_id, title, .. } => {
            assert_eq!(parent_id, ItemId::new("R1"));
            assert_eq!(title, "Parent Title");
        }
        other => panic!("expected Created, got {other:?}"),
    }
}

#[tokio::test]
async fn standalone_attachment_owns_its_note() {
    let text = paper_text();
    let mut standalone = attachment("A9", None, "application/pdf", Some(&text));
    standalone.title = Some("Loose PDF".into());
    let lib = JsonLibrary::in_memory(1, vec![standalone]);
    let llm = ScriptedClient::answering("Done.");
    let selection = lib.selection(&ItemId::new("A9"));
    let outcome = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    assert_eq!(notes_under(&lib, "A9").len(), 1);
    match outcome {
        SummaryOutcome::Created { parent_id, title, .. } => {
            assert_eq!(parent_id, ItemId::new("A9"));
            assert_eq!(title, "Loose PDF");
        }
        other => panic!("expected Created, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_titles_fall_back_to_untitled() {
    let text = paper_text();
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", None),
            attachment("A1", Some("R1"), "application/pdf", Some(&text)),
        ],
    );
    let llm = ScriptedClient::answering("Done.");
    let selection = lib.selection(&ItemId::new("R1"));
    summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains("titled \"Untitled Item\""));
}

// ── Duplicate detection ──────────────────────────────────────────────────────

#[tokio::test]
async fn existing_summary_short_circuits_without_llm_call() {
    let text = paper_text();
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some(&text)),
            note("N1", "R1", "<p>my own notes</p>"),
            note("N2", "R1", &format!("{HEADER}\n<p>old summary</p>")),
        ],
    );
    let llm = ScriptedClient::answering("should not be used");
    let selection = lib.selection(&ItemId::new("R1"));

    let outcome = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    assert_eq!(
        outcome,
        SummaryOutcome::AlreadyExists {
            note_id: ItemId::new("N2"),
            parent_id: ItemId::new("R1"),
        }
    );
    assert_eq!(llm.calls(), 0);
    assert_eq!(notes_under(&lib, "R1").len(), 2);
}

#[tokio::test]
async fn duplicate_check_runs_before_length_check() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some("only a stub")),
            note("N1", "R1", &format!("{HEADER}\n<p>old summary</p>")),
        ],
    );
    let llm = ScriptedClient::failing("must not be called");
    let selection = lib.selection(&ItemId::new("R1"));

    let outcome = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    assert_eq!(
        outcome,
        SummaryOutcome::AlreadyExists {
            note_id: ItemId::new("N1"),
            parent_id: ItemId::new("R1"),
        }
    );
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn summary_from_another_model_is_not_a_duplicate() {
    let text = paper_text();
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some(&text)),
            note("N1", "R1", "<h2>AI Generated Summary (other-model)</h2>\n<p>x</p>"),
        ],
    );
    let llm = ScriptedClient::answering("Fresh.");
    let selection = lib.selection(&ItemId::new("R1"));
    let outcome = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    assert!(outcome.is_created());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn skip_existing_check_always_generates() {
    let text = paper_text();
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some(&text)),
            note("N1", "R1", &format!("{HEADER}\n<p>old</p>")),
        ],
    );
    let llm = ScriptedClient::answering("Again.");
    let config = SummaryConfig::builder()
        .model_name("test-model")
        .skip_existing_check(true)
        .build()
        .unwrap();
    let selection = lib.selection(&ItemId::new("R1"));
    let outcome = summarize(selection.as_ref(), &lib, &llm, &config).await.unwrap();

    assert!(outcome.is_created());
    assert_eq!(llm.calls(), 1);
    assert_eq!(notes_under(&lib, "R1").len(), 2);
}

// ── Input errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_selection_is_an_input_error() {
    let lib = JsonLibrary::in_memory(1, vec![]);
    let llm = ScriptedClient::answering("unused");
    let err = summarize(None, &lib, &llm, &config()).await.unwrap_err();

    assert!(matches!(err, SummaryError::Input(InputError::NoSelection)));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn short_text_reports_exact_character_count() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some("  too short to summarise  ")),
        ],
    );
    let llm = ScriptedClient::answering("unused");
    let selection = lib.selection(&ItemId::new("R1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap_err();

    assert!(matches!(
        err,
        SummaryError::Input(InputError::TextTooShort { chars: 22 })
    ));
    assert!(err.user_message().contains("22"));
    assert_eq!(llm.calls(), 0);
    assert!(notes_under(&lib, "R1").is_empty());
}

#[tokio::test]
async fn record_without_attachments_fails() {
    let lib = JsonLibrary::in_memory(1, vec![record("R1", Some("T"))]);
    let llm = ScriptedClient::answering("unused");
    let selection = lib.selection(&ItemId::new("R1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap_err();

    assert!(matches!(err, SummaryError::Input(InputError::NoAttachments)));
}

#[tokio::test]
async fn record_with_only_unusable_attachments_fails() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "image/png", Some(&paper_text())),
            attachment("A2", Some("R1"), "application/pdf", Some("   ")),
        ],
    );
    let llm = ScriptedClient::answering("unused");
    let selection = lib.selection(&ItemId::new("R1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap_err();

    assert!(matches!(err, SummaryError::Input(InputError::NoExtractableText)));
}

#[tokio::test]
async fn unindexed_attachment_fails() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", None),
        ],
    );
    let llm = ScriptedClient::answering("unused");
    let selection = lib.selection(&ItemId::new("A1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap_err();

    assert!(matches!(err, SummaryError::Input(InputError::NotIndexed)));
}

#[tokio::test]
async fn unsupported_attachment_type_fails() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![attachment("A1", None, "application/epub+zip", Some(&paper_text()))],
    );
    let llm = ScriptedClient::answering("unused");
    let selection = lib.selection(&ItemId::new("A1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap_err();

    assert!(matches!(err, SummaryError::Input(InputError::UnsupportedAttachment)));
}

#[tokio::test]
async fn note_selection_is_unsupported() {
    let lib = JsonLibrary::in_memory(1, vec![record("R1", None), note("N1", "R1", "<p>x</p>")]);
    let llm = ScriptedClient::answering("unused");
    let selection = lib.selection(&ItemId::new("N1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap_err();

    assert!(matches!(err, SummaryError::Input(InputError::UnsupportedSelection)));
}

// ── LLM failures ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_llm_call_leaves_no_note() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some(&paper_text())),
        ],
    );
    let llm = ScriptedClient::failing("connection refused");
    let selection = lib.selection(&ItemId::new("R1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap_err();

    assert!(err.is_llm());
    assert!(err.user_message().starts_with("Error: "));
    assert!(err.user_message().contains("connection refused"));
    assert!(notes_under(&lib, "R1").is_empty());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_events_arrive_in_stage_order() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some(&paper_text())),
        ],
    );
    let llm = ScriptedClient::answering("ok");
    let cb = Arc::new(RecordingCallback::default());
    let config = config_with(cb.clone());
    let selection = lib.selection(&ItemId::new("R1"));
    let outcome = summarize(selection.as_ref(), &lib, &llm, &config).await.unwrap();

    assert_eq!(
        cb.events(),
        vec![
            "stage:ResolveTarget:0".to_string(),
            "start:T".into(),
            "stage:CheckDuplicate:20".into(),
            "stage:ValidateTextLength:20".into(),
            "stage:BuildPrompt:50".into(),
            "stage:CallLlm:50".into(),
            "stage:RenderHtml:80".into(),
            "stage:PersistNote:80".into(),
            format!("complete:{}", outcome.note_id()),
        ]
    );
}

#[tokio::test]
async fn duplicate_reports_already_exists_event() {
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some("T")),
            attachment("A1", Some("R1"), "application/pdf", Some(&paper_text())),
            note("N1", "R1", &format!("{HEADER}\n<p>old</p>")),
        ],
    );
    let llm = ScriptedClient::answering("unused");
    let cb = Arc::new(RecordingCallback::default());
    let config = config_with(cb.clone());
    let selection = lib.selection(&ItemId::new("R1"));
    summarize(selection.as_ref(), &lib, &llm, &config).await.unwrap();

    let events = cb.events();
    assert_eq!(events.last().map(String::as_str), Some("exists"));
    assert!(!events.iter().any(|e| e.starts_with("stage:CallLlm")));
}

#[tokio::test]
async fn errors_reach_the_callback_with_prefix() {
    let lib = JsonLibrary::in_memory(1, vec![record("R1", Some("T"))]);
    let llm = ScriptedClient::answering("unused");
    let cb = Arc::new(RecordingCallback::default());
    let config = config_with(cb.clone());
    let selection = lib.selection(&ItemId::new("R1"));
    let err = summarize(selection.as_ref(), &lib, &llm, &config).await.unwrap_err();

    assert_eq!(
        cb.events().last().cloned(),
        Some(format!("error:{}", err.user_message()))
    );
}

#[tokio::test]
async fn long_titles_are_shortened_for_progress() {
    let title = "A".repeat(80);
    let lib = JsonLibrary::in_memory(
        1,
        vec![
            record("R1", Some(&title)),
            attachment("A1", Some("R1"), "application/pdf", Some(&paper_text())),
        ],
    );
    let llm = ScriptedClient::answering("ok");
    let cb = Arc::new(RecordingCallback::default());
    let config = config_with(cb.clone());
    let selection = lib.selection(&ItemId::new("R1"));
    summarize(selection.as_ref(), &lib, &llm, &config).await.unwrap();

    let expected = format!("start:{}...", "A".repeat(50));
    assert!(cb.events().contains(&expected));
}

// ── File-backed library ──────────────────────────────────────────────────────

#[tokio::test]
async fn note_is_persisted_to_manifest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fulltext.txt"), paper_text()).unwrap();
    let manifest = serde_json::json!({
        "libraryId": 1,
        "items": [
            { "key": "R1", "itemType": "journalArticle", "title": "On Disk" },
            { "key": "A1", "itemType": "attachment", "parentKey": "R1",
              "contentType": "application/pdf", "textPath": "fulltext.txt" }
        ]
    });
    let path = dir.path().join("library.json");
    std::fs::write(&path, manifest.to_string()).unwrap();

    let lib = JsonLibrary::open(&path).await.unwrap();
    let llm = ScriptedClient::answering("## Result\nIt works.");
    let selection = lib.selection(&ItemId::new("R1"));
    let outcome = summarize(selection.as_ref(), &lib, &llm, &config()).await.unwrap();

    let reopened = JsonLibrary::open(&path).await.unwrap();
    assert_eq!(
        reopened.note_content(outcome.note_id()).as_deref(),
        Some(format!("{HEADER}\n<h2>Result</h2>\n<p>It works.</p>").as_str())
    );
}
