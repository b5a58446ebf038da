//! Brace-placeholder substitution for prompts and note headers.
//!
//! Two unrelated mechanisms live here:
//!
//! * [`substitute`] scans for `{key}` tokens and replaces the ones it has a
//!   value for. Used to fill `{title}` and `{text}` into the prompt.
//! * [`render_header`] replaces the literal `{{modelName}}` token in the
//!   note header template by exact string match. The result doubles as the
//!   duplicate-detection prefix, so it is never passed through anything else.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Token replaced in the header template.
pub const MODEL_NAME_TOKEN: &str = "{{modelName}}";

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());

/// Replace every `{key}` in `template` whose key is present in `params`.
///
/// Unknown keys are left as the literal `{key}`. Replacement is a single
/// left-to-right pass: braces inside substituted values are never scanned.
pub fn substitute(template: &str, params: &HashMap<&str, &str>) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match params.get(&caps[1]) {
            Some(value) => (*value).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Produce the note header for `model_name`.
///
/// Only the first `{{modelName}}` occurrence is replaced.
pub fn render_header(header_template: &str, model_name: &str) -> String {
    header_template.replacen(MODEL_NAME_TOKEN, model_name, 1)
}
