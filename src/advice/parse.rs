//! Extraction of structured advice from raw model output.
//!
//! Models wrap JSON in prose and markdown in every way imaginable, so
//! parsing tries three extractions in order of specificity: a fenced code
//! block, then the outermost brace span, then the whole response.

use crate::pipeline::types::{Category, Priority};
use serde::Deserialize;

/// The JSON payload the model is asked to produce.
#[derive(Debug, Deserialize)]
pub struct AdvicePayload {
    pub priority: Priority,
    pub category: Category,
    pub insight: String,
    #[serde(alias = "suggested_action")]
    pub action: String,
}

/// Parse a raw model response into an advice payload, if any extraction
/// succeeds.
pub fn parse_advice(raw: &str) -> Option<AdvicePayload> {
    for candidate in [fenced_block(raw), brace_span(raw), Some(raw)]
        .into_iter()
        .flatten()
    {
        if let Ok(payload) = serde_json::from_str::<AdvicePayload>(candidate.trim()) {
            return Some(payload);
        }
    }
    None
}

/// Contents of the first ```json or ``` fenced block, if present.
fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after_fence = &raw[start + 3..];
    let body = after_fence
        .strip_prefix("json")
        .unwrap_or(after_fence)
        .trim_start_matches(['\r', '\n']);
    let end = body.find("```")?;
    Some(&body[..end])
}

/// The span from the first `{` to the last `}`, if both exist.
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
