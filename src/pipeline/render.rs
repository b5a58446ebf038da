//! Markdown-to-HTML rendering of the model's response.
//!
//! Only a fixed subset is understood: `##`/`###` headings, `**bold**`,
//! `-` bullets, `1.` numbered items and paragraphs. Everything else
//! (nested lists, inline code, links) passes through as escaped text.
//!
//! ## Order of operations
//!
//! 1. Escape `&`, `<`, `>` in the whole text.
//! 2. Turn `**x**` into `<strong>x</strong>` on the escaped text, so the
//!    generated tags survive and a literal `<` inside a bold span is
//!    already `&lt;`.
//! 3. Walk the lines once with a two-mode list state machine.

use crate::error::RenderError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"^###\s+(.+)$").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"^##\s+(.+)$").unwrap());
static RE_UL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-\s+(.+)$").unwrap());
static RE_OL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+(.+)$").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Escape the three characters that matter inside note HTML.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escaped text wrapped in `<pre>`; the fallback when [`render_markdown`] fails.
pub fn render_preformatted(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMode {
    None,
    Unordered,
    Ordered,
}

/// Emits block elements, one per line of output.
struct Renderer {
    out: String,
    list: ListMode,
}

impl Renderer {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            list: ListMode::None,
        }
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) -> Result<(), RenderError> {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.write_fmt(args)?;
        Ok(())
    }

    fn close_list(&mut self) -> Result<(), RenderError> {
        match self.list {
            ListMode::None => {}
            ListMode::Unordered => self.emit(format_args!("</ul>"))?,
            ListMode::Ordered => self.emit(format_args!("</ol>"))?,
        }
        self.list = ListMode::None;
        Ok(())
    }

    fn list_item(&mut self, mode: ListMode, text: &str) -> Result<(), RenderError> {
        if self.list != mode {
            self.close_list()?;
            match mode {
                ListMode::Unordered => self.emit(format_args!("<ul>"))?,
                ListMode::Ordered => self.emit(format_args!("<ol>"))?,
                ListMode::None => {}
            }
            self.list = mode;
        }
        self.emit(format_args!("<li>{text}</li>"))
    }

    fn line(&mut self, raw: &str) -> Result<(), RenderError> {
        let line = raw.trim();
        if line.is_empty() {
            return self.close_list();
        }

        if let Some(caps) = RE_H3.captures(line) {
            self.close_list()?;
            return self.emit(format_args!("<h3>{}</h3>", &caps[1]));
        }
        if let Some(caps) = RE_H2.captures(line) {
            self.close_list()?;
            return self.emit(format_args!("<h2>{}</h2>", &caps[1]));
        }
        if let Some(caps) = RE_UL.captures(line) {
            return self.list_item(ListMode::Unordered, &caps[1]);
        }
        if let Some(caps) = RE_OL.captures(line) {
            return self.list_item(ListMode::Ordered, &caps[1]);
        }

        self.close_list()?;
        let collapsed = RE_SPACES.replace_all(line, " ");
        self.emit(format_args!("<p>{collapsed}</p>"))
    }

    fn finish(mut self) -> Result<String, RenderError> {
        self.close_list()?;
        Ok(self.out)
    }
}

/// Render the model's Markdown into the restricted HTML subset.
///
/// Output blocks are joined with `\n`; empty input yields an empty string.
pub fn render_markdown(markdown: &str) -> Result<String, RenderError> {
    if markdown.is_empty() {
        return Ok(String::new());
    }

    let escaped = escape_html(markdown);
    let bolded = RE_BOLD.replace_all(&escaped, "<strong>$1</strong>");

    let mut renderer = Renderer::new(bolded.len() + 64);
    for line in bolded.split('\n') {
        renderer.line(line)?;
    }
    renderer.finish()
}
