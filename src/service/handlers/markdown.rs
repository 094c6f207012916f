//! Markdown document generation with element checks

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::{HandlerContext, HandlerResult};
use crate::model::Answer;

const MARKDOWN_PROMPT: &str = r#"Create a detailed Markdown document about a fictional step tracking analysis
that includes all the specified Markdown elements:
- Top-level heading
- Subheadings
- Bold and italic text
- Inline code
- Code block
- Bulleted list
- Numbered list
- Table
- Hyperlink
- Image reference
- Blockquote

The document should be about a week-long step tracking analysis comparing
personal step counts with friends.

Respond with the Markdown document only."#;

static ELEMENT_CHECKS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("top_level_heading", r"(?m)^# "),
        ("subheading", r"(?m)^## "),
        ("bold_text", r"\*\*\w[^*]*\*\*"),
        ("italic_text", r"(?:^|[^*])\*\w[^*]*\*(?:[^*]|$)"),
        ("inline_code", r"`[^`\n]+`"),
        ("code_block", r"```[\s\S]*?```"),
        ("bulleted_list", r"(?m)^[-*] "),
        ("numbered_list", r"(?m)^1\. "),
        ("table", r"(?m)^\|.*\|\s*$"),
        ("hyperlink", r"(?:^|[^!])\[[^\]]+\]\([^)]+\)"),
        ("image", r"!\[[^\]]*\]\([^)]+\)"),
        ("blockquote", r"(?m)^> "),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid markdown check regex")))
    .collect()
});

/// Which required Markdown elements appear in `content`
pub fn validate(content: &str) -> Map<String, Value> {
    ELEMENT_CHECKS
        .iter()
        .map(|(name, re)| (name.to_string(), Value::Bool(re.is_match(content))))
        .collect()
}

/// Models often wrap the whole answer in a ```markdown fence
fn strip_outer_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```markdown").or_else(|| trimmed.strip_prefix("```md"))
    else {
        return trimmed;
    };
    rest.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let raw = ctx.model.generate(MARKDOWN_PROMPT, None).await?;
    let markdown = strip_outer_fence(&raw).to_string();
    let validation = validate(&markdown);

    let missing: Vec<&String> = validation
        .iter()
        .filter(|(_, present)| *present == &Value::Bool(false))
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "Generated Markdown lacks required elements");
    }

    Ok(Answer::new(markdown).with("validation", Value::Object(validation)))
}
