//! Intent classification for incoming questions.

use qanun_core::types::Intent;
use tracing::{debug, warn};

use crate::completion::{ChatMessage, CompletionClient, CompletionRequest};

/// Output-token cap for the one-word classification reply.
const CLASSIFY_MAX_TOKENS: u32 = 15;

/// Classify the user's latest message against the recent history.
///
/// The model is asked for exactly one label word at temperature 0; the raw
/// reply maps onto [`Intent`] by exact match. Any call failure degrades to
/// `CasualConversation` instead of propagating: a misclassified legal
/// question becomes a conversational reply rather than a failed request, so
/// this function never returns an error.
pub async fn classify_intent(
    client: &dyn CompletionClient,
    model: &str,
    question: &str,
    history: &[ChatMessage],
) -> Intent {
    let formatted_history = history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Conversation History:\n\
         {formatted_history}\n\
         \n\
         User's Latest Message: \"{question}\"\n\
         \n\
         Classify the user's latest message into one of three categories:\n\
         1. LegalQuestion - A specific, detailed legal question that can be answered with legal sources\n\
         2. VagueLegalInquiry - A vague mention of a legal issue that needs more details (e.g., \"I have a problem\", \"We have some asset issue\")\n\
         3. CasualConversation - General chat, greetings, or non-legal questions\n\
         \n\
         Respond with only one word: LegalQuestion, VagueLegalInquiry, or CasualConversation."
    );

    let request = CompletionRequest::new(model, vec![ChatMessage::system(prompt)])
        .with_temperature(0.0)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

    match client.complete(request).await {
        Ok(raw) => {
            let intent = Intent::parse(&raw);
            debug!(%intent, "Intent classified");
            intent
        }
        Err(e) => {
            warn!(error = %e, "Intent classification failed, defaulting to casual");
            Intent::CasualConversation
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
