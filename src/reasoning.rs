//! Chain-of-thought extraction.
//!
//! Reasoning text reaches us in one of two ways: as a dedicated field on the vendor
//! message (`reasoning_content` from DeepSeek, `reasoning` from OpenRouter), or inline in
//! the visible content wrapped in `<think>` / `<thinking>` tags. The field wins when
//! both are present.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static THINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>(.*?)</think>").expect("think pattern is valid"));
static THINKING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<thinking>(.*?)</thinking>").expect("thinking pattern is valid")
});

const REASONING_FIELDS: [&str; 2] = ["reasoning_content", "reasoning"];

/// Visible content and the reasoning pulled out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReasoning {
    pub content: String,
    pub reasoning: Option<String>,
}

/// Runs the field-based strategy on the vendor message object, then the tag-based one
/// on `content`.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::reasoning::extract_reasoning;
/// use serde_json::json;
///
/// let tagged = extract_reasoning(None, "<think>because X</think>The answer is 4");
/// assert_eq!(tagged.reasoning.as_deref(), Some("because X"));
/// assert_eq!(tagged.content, "The answer is 4");
///
/// let message = json!({"content": "4", "reasoning_content": "2 + 2"});
/// let field = extract_reasoning(message.as_object(), "4");
/// assert_eq!(field.reasoning.as_deref(), Some("2 + 2"));
/// assert_eq!(field.content, "4");
/// ```
pub fn extract_reasoning(
    raw_message: Option<&Map<String, Value>>,
    content: &str,
) -> ExtractedReasoning {
    if let Some(reasoning) = raw_message.and_then(reasoning_field) {
        return ExtractedReasoning {
            content: content.to_string(),
            reasoning: Some(reasoning),
        };
    }
    extract_reasoning_from_tags(content)
}

/// Tag-based strategy alone; only the first block is removed.
pub fn extract_reasoning_from_tags(content: &str) -> ExtractedReasoning {
    let found = [&*THINK_TAG, &*THINKING_TAG]
        .into_iter()
        .find_map(|pattern| pattern.captures(content));

    match found {
        Some(captures) => {
            let block = captures.get(0).map_or(0..0, |m| m.range());
            let mut cleaned = String::with_capacity(content.len());
            cleaned.push_str(&content[..block.start]);
            cleaned.push_str(&content[block.end..]);
            ExtractedReasoning {
                content: cleaned.trim().to_string(),
                reasoning: Some(captures[1].trim().to_string()),
            }
        }
        None => ExtractedReasoning {
            content: content.to_string(),
            reasoning: None,
        },
    }
}

fn reasoning_field(message: &Map<String, Value>) -> Option<String> {
    REASONING_FIELDS.iter().find_map(|field| {
        message
            .get(*field)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}
