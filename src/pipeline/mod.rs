//! Pipeline stages for turning a library selection into a summary note.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable without the others.
//!
//! ## Data Flow
//!
//! ```text
//! resolve ──▶ prompt ──▶ llm ──▶ render
//! (selection)  (text)    (HTTP)   (HTML)
//! ```
//!
//! 1. [`resolve`]: pick the attachment and note owner, extract its text
//! 2. [`crate::prompts`]: fill title and text into the prompt
//! 3. [`llm`]: the single chat-completion call; the only network I/O
//! 4. [`render`]: Markdown subset to note HTML

pub mod llm;
pub mod render;
pub mod resolve;
