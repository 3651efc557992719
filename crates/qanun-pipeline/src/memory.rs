//! Memory extraction and history windowing.
//!
//! Facts the user volunteers about themselves (name, age, home city, legal
//! topics) are pulled out of the raw history and fed back to the model as a
//! single synthetic system message, so the assistant stays consistent across
//! a long conversation without any persistent profile storage.

use qanun_core::config::HistoryConfig;
use qanun_core::types::{MemoryContext, Message};
use regex::Regex;

use crate::completion::ChatMessage;

/// Legal-topic keywords scanned for in both Azerbaijani orthographies.
const LEGAL_TOPIC_KEYWORDS: [&str; 13] = [
    "hüquqi", "hukuki", "qanun", "kanun", "məhkəmə", "mahkeme", "vəsiqə", "vesike", "mülk",
    "mulk", "miras", "boşanma", "bosanma",
];

/// Fact-extraction strategy over a conversation history.
///
/// [`RegexMemoryExtractor`] is the default; a model-based extractor can slot
/// in behind this trait without touching the orchestrator.
pub trait MemoryExtract: Send + Sync {
    /// Derive the known-facts summary from the full message history.
    ///
    /// Pure and infallible: a pattern that matches nothing simply leaves its
    /// field unset.
    fn extract(&self, history: &[Message]) -> MemoryContext;
}

/// Pattern-based extractor for self-reported facts in Azerbaijani text.
///
/// All message text (any role) is concatenated and scanned. Patterns are
/// tried in order and the first capture wins per field; later mentions never
/// override earlier ones.
pub struct RegexMemoryExtractor {
    name_patterns: Vec<Regex>,
    age_patterns: Vec<Regex>,
    location_patterns: Vec<Regex>,
}

impl RegexMemoryExtractor {
    pub fn new() -> Self {
        let word = "[A-Za-zəƏğĞıİöÖşŞüÜçÇ]+";

        let name_patterns = vec![Regex::new(&format!(
            r"(?i)(?:mənim adım|menim adim|adım|adim|adı|adi)\s+(?:budur\s+)?({word})"
        ))
        .expect("Invalid name regex")];

        let age_patterns = vec![
            Regex::new(r"(?i)(?:yaşım|yasim|yaş|yas)\s+(?:budur\s+)?(\d+)")
                .expect("Invalid age regex"),
            Regex::new(r"(?i)(\d+)\s+(?:yaşında|yasinda|yaş|yas)").expect("Invalid age regex"),
        ];

        let location_patterns = vec![
            Regex::new(&format!(
                r"(?i)(?:yaşadığım|yasadigim|yaşadığı|yasadigi)\s+(?:yer|şəhər|seher)\s+(?:budur\s+)?({word})"
            ))
            .expect("Invalid location regex"),
            Regex::new(r"(?i)(Bakı|Baku|Gəncə|Gence|Sumqayıt|Sumqayit|Naxçıvan|Naxcivan)")
                .expect("Invalid city regex"),
        ];

        Self {
            name_patterns,
            age_patterns,
            location_patterns,
        }
    }
}

impl Default for RegexMemoryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryExtract for RegexMemoryExtractor {
    fn extract(&self, history: &[Message]) -> MemoryContext {
        let text = history
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let lowered = text.to_lowercase();

        let name = first_capture(&self.name_patterns, &text);
        let age = self
            .age_patterns
            .iter()
            .find_map(|pattern| pattern.captures(&text))
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        let location = first_capture(&self.location_patterns, &text);
        let topics = LEGAL_TOPIC_KEYWORDS
            .iter()
            .filter(|keyword| lowered.contains(**keyword))
            .map(|keyword| keyword.to_string())
            .collect();

        MemoryContext {
            name,
            age,
            location,
            topics,
        }
    }
}

/// First capture group of the first pattern that matches, trimmed.
fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Build the role-tagged prompt history for a model call.
///
/// With no extracted facts the last `full_window` messages pass through
/// unchanged. With facts, a synthetic system message carrying the memory
/// block is followed by the last `memory_window` messages; recency wins over
/// completeness, and the count-based cut keeps the prompt size bounded
/// without token counting.
pub fn window_history(
    history: &[Message],
    memory: &MemoryContext,
    config: &HistoryConfig,
) -> Vec<ChatMessage> {
    if memory.is_empty() {
        return tail(history, config.full_window)
            .iter()
            .map(to_chat_message)
            .collect();
    }

    let system = format!(
        "Sən Azərbaycan dilində danışan hüquqşünas köməkçisisən. İstifadəçi haqqında məlumat:\n{}\nBu məlumatları cavablarında istifadə et və yadda saxla.",
        memory.to_prompt()
    );

    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(tail(history, config.memory_window).iter().map(to_chat_message));
    messages
}

fn tail(history: &[Message], count: usize) -> &[Message] {
    &history[history.len().saturating_sub(count)..]
}

fn to_chat_message(message: &Message) -> ChatMessage {
    ChatMessage {
        role: message.role.to_string(),
        content: message.content.clone(),
    }
}

// =============================================================================
// Tests
// =============================================================================
