//! Prompt construction for the coaching model.

use crate::pipeline::types::Turn;
use std::fmt::Write;

/// Build the analysis prompt from recent context plus the current turn.
///
/// The context window is already bounded by the caller; turns are rendered
/// oldest first, with speaker labels, so the model sees the conversation
/// as it unfolded.
pub fn build_prompt(context: &[Turn], current: &Turn) -> String {
    let mut transcript = String::new();
    for turn in context {
        let _ = writeln!(transcript, "{}: {}", turn.speaker.as_str(), turn.text);
    }
    let _ = writeln!(transcript, "{}: {}", current.speaker.as_str(), current.text);

    format!(
        "You are a real-time conversation coach. Analyze this live conversation \
         and give one piece of actionable coaching advice for the latest statement.\n\
         \n\
         Conversation:\n\
         {transcript}\n\
         Respond with JSON only, in exactly this format:\n\
         {{\n\
         \x20 \"priority\": \"HIGH|MEDIUM|LOW\",\n\
         \x20 \"category\": \"RAPPORT_BUILDING|LISTENING|QUESTIONING|OBJECTION_HANDLING|CLOSING|OTHER\",\n\
         \x20 \"insight\": \"one sentence on what is happening\",\n\
         \x20 \"action\": \"one concrete thing to say or do next\"\n\
         }}"
    )
}

/// Stricter prompt for the single retry after an unparseable response.
pub fn strict_retry_prompt(context: &[Turn], current: &Turn) -> String {
    format!(
        "{}\n\nOutput ONLY the JSON object. No prose, no markdown, no code fences.",
        build_prompt(context, current)
    )
}
