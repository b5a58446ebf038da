//! Prompt text and note-header defaults.
//!
//! The skeleton is fixed; callers only supply the instruction block through
//! [`crate::config::SummaryConfig::user_prompt_instructions`]. The block is
//! appended verbatim before placeholder substitution, so a `{title}` typed
//! into the instructions is filled in like the one in the skeleton.

use crate::template::substitute;
use std::collections::HashMap;

/// Fixed framing around the paper text. `{title}` and `{text}` are filled
/// by [`build_prompt`].
pub const PROMPT_SKELETON: &str = r#"Below is the full text from a research paper titled "{title}".
--- START OF PAPER ---
{text}
--- END OF PAPER ---"#;

/// Instruction block used when none is configured.
pub const DEFAULT_INSTRUCTIONS: &str = r#"Please provide a clear and specific summary that explains the paper's core contribution. Focus on describing the causal relationship between methods and results.

Structure your answer to address:

1. **What specific problem or limitation in existing work does this paper address?**
2. **What exact method/approach/technique did the authors develop or use?**
3. **What specific results did this method produce, and how do these results solve the original problem?**
4. **What is the broader impact or significance of these findings?**

Requirements:
- Be specific and concrete, avoid vague descriptions
- Clearly connect the method to the results (cause-effect relationship)
- Do NOT simply copy or rephrase the abstract
- Focus on technical details that make the contribution clear
- Include quantitative data if available in the text"#;

/// Header prepended to every generated note.
pub const DEFAULT_HEADER_TEMPLATE: &str = "<h2>AI Generated Summary ({{modelName}})</h2>";

/// Title used when neither the note parent nor the attachment has one.
pub const UNTITLED: &str = "Untitled Item";

/// Skeleton followed by the instruction block, placeholders still unfilled.
pub fn prompt_template(instructions: &str) -> String {
    format!("{PROMPT_SKELETON}\n{instructions}")
}

/// Build the final prompt sent to the model.
pub fn build_prompt(instructions: &str, title: &str, text: &str) -> String {
    let params: HashMap<&str, &str> = [("title", title), ("text", text)].into_iter().collect();
    substitute(&prompt_template(instructions), &params)
}
