//! Recovery helpers for model output that is supposed to be JSON.
//!
//! Models asked for "ONLY valid JSON" still wrap answers in markdown
//! fences often enough that every JSON call site strips them first.

use clarion_core::{ClarionError, Result};
use serde_json::Value;

/// Strip a leading ```json / ``` fence and a trailing ``` fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        trimmed
    };
    body.trim().strip_suffix("```").map(str::trim).unwrap_or_else(|| body.trim())
}

/// Parse model output as a JSON object, tolerating fences and leading or
/// trailing prose. Falls back to the outermost `{...}` span before giving
/// up with [`ClarionError::MalformedModelOutput`].
pub fn extract_object(text: &str) -> Result<Value> {
    let cleaned = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        if value.is_object() {
            return Ok(value);
        }
    }

    // Last resort: outermost brace span
    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                if value.is_object() {
                    return Ok(value);
                }
            }
        }
    }

    let snippet: String = cleaned.chars().take(120).collect();
    Err(ClarionError::MalformedModelOutput(snippet))
}
