//! Rule-based fallback advice.
//!
//! A pure, total function over the turn text: every input maps to some
//! advice, so the fallback path has no failure mode. The rule table is
//! explicit and ordered, first match wins.

use crate::pipeline::types::{AdviceSource, Category, CoachingAdvice, Priority};

const PRICE_WORDS: &[&str] = &["price", "cost", "expensive", "budget", "money"];
const PAIN_WORDS: &[&str] = &["problem", "challenge", "issue", "difficult"];
const SOLUTION_WORDS: &[&str] = &["solution", "help", "solve", "fix"];
const CLOSING_WORDS: &[&str] = &["contract", "sign", "buy", "purchase", "deal"];
const GREETING_WORDS: &[&str] = &["hello", "hi", "thanks", "thank", "goodbye", "bye"];

/// Word count above which an utterance counts as detailed sharing.
const DETAILED_WORD_COUNT: usize = 20;

fn contains_any(text: &str, words: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| words.contains(&word))
}

/// Classify one turn's text into coaching advice.
pub fn advise(turn_id: u64, text: &str) -> CoachingAdvice {
    let lower = text.to_lowercase();
    let word_count = text.split_whitespace().count();

    let (priority, category, insight, action) = if contains_any(&lower, PRICE_WORDS) {
        (
            Priority::High,
            Category::ObjectionHandling,
            "Price concerns are on the table",
            "Steer toward value and cost of inaction rather than defending the number",
        )
    } else if contains_any(&lower, PAIN_WORDS) {
        (
            Priority::High,
            Category::Questioning,
            "Pain points are being shared",
            "Ask follow-up questions to quantify the impact and urgency",
        )
    } else if text.contains('?') {
        (
            Priority::High,
            Category::Questioning,
            "A question signals engagement",
            "Answer clearly, then ask a follow-up question to keep the dialogue going",
        )
    } else if contains_any(&lower, CLOSING_WORDS) {
        (
            Priority::Medium,
            Category::Closing,
            "Buying signals are appearing",
            "Summarize agreed value and propose a concrete next step",
        )
    } else if contains_any(&lower, SOLUTION_WORDS) {
        (
            Priority::Medium,
            Category::Other,
            "An opening to present your solution",
            "Connect what you offer directly to the needs already voiced",
        )
    } else if word_count > DETAILED_WORD_COUNT {
        (
            Priority::Medium,
            Category::Listening,
            "Detailed information is being shared",
            "Listen actively and summarize the key points back",
        )
    } else if contains_any(&lower, GREETING_WORDS) {
        (
            Priority::Low,
            Category::RapportBuilding,
            "A rapport-building moment",
            "Acknowledge them warmly and transition into a discovery question",
        )
    } else {
        (
            Priority::Low,
            Category::Listening,
            "Keep gathering information",
            "Hold the space with open-ended questions and active listening",
        )
    };

    CoachingAdvice {
        turn_id,
        priority,
        category,
        insight: insight.to_string(),
        action: action.to_string(),
        source: AdviceSource::RuleBased,
    }
}
