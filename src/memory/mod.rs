//! Per-user personal context
//!
//! Detects "forget" commands, extracts personal details users share about
//! themselves, and keeps the resulting memory in a [`MemoryStore`].

pub mod store;

pub use store::{InMemoryStore, MemoryStore};

use crate::openrouter::ChatMessage;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix for the system message that carries a user's memory
pub const MEMORY_CONTEXT_PREFIX: &str =
    "User's personal context (use this to personalize responses): ";

/// Patterns for personal details, checked in order against the original text
///
/// Single-word captures stop at the first non-ASCII character.
const PERSONAL_INFO_PATTERNS: [&str; 12] = [
    r"(?i)my name is ((?-u:\w)+)",
    r"(?i)call me ((?-u:\w)+)",
    r"(?i)i'm ((?-u:\w)+)",
    r"(?i)i am ((?-u:\w)+)",
    r"(?i)i work at (.+)",
    r"(?i)i work as (.+)",
    r"(?i)i'm a (.+)",
    r"(?i)i am a (.+)",
    r"(?i)my job is (.+)",
    r"(?i)i live in (.+)",
    r"(?i)i'm from (.+)",
    r"(?i)i am from (.+)",
];

static PERSONAL_INFO: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PERSONAL_INFO_PATTERNS
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(pattern, error = %e, "Personal info pattern failed to compile");
                None
            }
        })
        .collect()
});

/// Whether a message asks to wipe the user's memory
///
/// Requires "forget" together with "memory", "everything" or "all".
pub fn is_forget_command(message: &str) -> bool {
    let lowered = message.trim().to_lowercase();
    lowered.contains("forget")
        && ["memory", "everything", "all"]
            .iter()
            .any(|word| lowered.contains(word))
}

/// Collect personal details from a message
///
/// Each matching pattern contributes its first full match followed by `". "`.
/// Returns an empty string when nothing matched.
pub fn extract_personal_info(message: &str) -> String {
    let mut detected = String::new();
    for re in PERSONAL_INFO.iter() {
        if let Some(m) = re.find(message) {
            detected.push_str(m.as_str());
            detected.push_str(". ");
        }
    }
    detected
}

/// Append newly detected details to existing memory
pub fn merge_memory(existing: Option<&str>, detected: &str) -> String {
    match existing {
        Some(existing) => format!("{} {}", existing, detected).trim().to_string(),
        None => detected.trim().to_string(),
    }
}

/// System message that hands the user's memory to the model
pub fn memory_context_message(memory: &str) -> ChatMessage {
    ChatMessage::system(format!("{}{}", MEMORY_CONTEXT_PREFIX, memory))
}
