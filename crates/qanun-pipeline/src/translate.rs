//! Markdown-preserving translation between human languages.

use tracing::warn;

use crate::completion::{ChatMessage, CompletionClient, CompletionRequest};

/// Output-token cap for a translated message.
const TRANSLATE_MAX_TOKENS: u32 = 1500;

/// Translate `text` between two named human languages.
///
/// Empty input returns empty output without a network call. On any call
/// failure, or an empty model reply, the original text comes back unchanged:
/// translation is display-side convenience and must never block message
/// delivery, so this function never returns an error.
pub async fn translate_text(
    client: &dyn CompletionClient,
    model: &str,
    text: &str,
    source_language: &str,
    target_language: &str,
) -> String {
    if text.is_empty() {
        return String::new();
    }

    let instruction = format!(
        "You are a professional translator. Translate the following text from {} to {}. \
         Do not add any commentary or extra text. Retain the original markdown formatting \
         (like **bold** or *italics*). Just provide the translation.",
        source_language, target_language
    );

    let request = CompletionRequest::new(
        model,
        vec![ChatMessage::system(instruction), ChatMessage::user(text)],
    )
    .with_temperature(0.0)
    .with_max_tokens(TRANSLATE_MAX_TOKENS);

    match client.complete(request).await {
        Ok(translated) if !translated.is_empty() => translated,
        Ok(_) => text.to_string(),
        Err(e) => {
            warn!(error = %e, "Translation failed, returning original text");
            text.to_string()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
