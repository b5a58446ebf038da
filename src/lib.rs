//! # paper-digest
//!
//! Summarise a paper from a reference library with an OpenAI-compatible
//! LLM and attach the summary to the record as an HTML note.
//!
//! ## Pipeline Overview
//!
//! ```text
//! selection
//!  │
//!  ├─ 1. Resolve    first PDF/HTML attachment with text, and the note owner
//!  ├─ 2. Duplicate  skip everything if a note already starts with the header
//!  ├─ 3. Validate   reject empty or < 100-character text
//!  ├─ 4. Prompt     fill {title} / {text} into the prompt skeleton
//!  ├─ 5. LLM        one POST {base}/chat/completions
//!  ├─ 6. Render     Markdown subset → HTML (preformatted fallback)
//!  └─ 7. Persist    header + "\n" + HTML saved as a child note
//! ```
//!
//! The host application (items, attachments, notes, text extraction) is
//! reached only through the [`Library`] trait. [`JsonLibrary`] implements it
//! over a JSON manifest for command-line use and tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper_digest::{summarize, ItemId, JsonLibrary, OpenAiClient, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SummaryConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let library = JsonLibrary::open("library.json").await?;
//!     let client = OpenAiClient::new(&config)?;
//!
//!     let selection = library.selection(&ItemId::new("R1"));
//!     let outcome = summarize(selection.as_ref(), &library, &client, &config).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper-digest` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod host;
pub mod library;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod summarize;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SummaryConfig, SummaryConfigBuilder};
pub use error::{InputError, RenderError, SummaryError};
pub use host::{Attachment, ContentType, HostError, ItemId, ItemRef, Library, NewNote, Record, Selection};
pub use library::{JsonLibrary, StoredItem};
pub use output::{NotePayload, SummaryOutcome};
pub use pipeline::llm::{CompletionClient, OpenAiClient};
pub use pipeline::render::render_markdown;
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, SummaryProgressCallback};
pub use summarize::summarize;
pub use template::substitute;
