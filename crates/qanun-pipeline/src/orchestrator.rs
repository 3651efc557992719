//! Answer orchestrator: wires extraction, classification, and synthesis.
//!
//! One inbound question is handled as a single linear async chain:
//! extract memory, window the history, classify intent, then branch into
//! exactly one of the three response strategies. The search integration is
//! optional; when absent, legal questions get a static notice instead of an
//! error.

use std::sync::Arc;

use qanun_core::config::{HistoryConfig, ModelConfig};
use qanun_core::types::{Intent, Message, SourceHit};
use tracing::{debug, info};

use crate::completion::CompletionClient;
use crate::error::Result;
use crate::intent::classify_intent;
use crate::memory::{window_history, MemoryExtract, RegexMemoryExtractor};
use crate::search::SourceSearch;
use crate::synthesis::{
    synthesize_casual, synthesize_legal, synthesize_vague, SEARCH_UNCONFIGURED_NOTICE,
};
use crate::translate::translate_text;

/// The outcome of one answer-generation call.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Final display text, references included on the legal path.
    pub content: String,
    /// How the question was classified.
    pub intent: Intent,
    /// Hits backing a legal answer; empty on the other paths.
    pub sources: Vec<SourceHit>,
}

/// Central coordinator for the answer pipeline.
pub struct AnswerOrchestrator {
    client: Arc<dyn CompletionClient>,
    search: Option<Arc<dyn SourceSearch>>,
    extractor: Box<dyn MemoryExtract>,
    model: ModelConfig,
    history: HistoryConfig,
}

impl AnswerOrchestrator {
    /// Create an orchestrator with the default regex memory extractor.
    ///
    /// `search` is `None` when the search integration is unconfigured; the
    /// legal path then degrades to a static notice.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        search: Option<Arc<dyn SourceSearch>>,
        model: ModelConfig,
        history: HistoryConfig,
    ) -> Self {
        Self {
            client,
            search,
            extractor: Box::new(RegexMemoryExtractor::new()),
            model,
            history,
        }
    }

    /// Replace the memory-extraction strategy.
    pub fn with_extractor(mut self, extractor: Box<dyn MemoryExtract>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Generate an answer to `question` given the chat's full history.
    ///
    /// Classification runs on the fast model and never fails; search and
    /// synthesis failures propagate to the caller, which surfaces a generic
    /// failure message.
    pub async fn generate_answer(&self, question: &str, full_history: &[Message]) -> Result<Answer> {
        let memory = self.extractor.extract(full_history);
        debug!(?memory, "Memory context extracted");

        let windowed = window_history(full_history, &memory, &self.history);

        let intent = classify_intent(
            self.client.as_ref(),
            &self.model.fast_model,
            question,
            &windowed,
        )
        .await;
        info!(%intent, "Generating answer");

        match intent {
            Intent::LegalQuestion => {
                let Some(search) = self.search.as_ref() else {
                    return Ok(Answer {
                        content: SEARCH_UNCONFIGURED_NOTICE.to_string(),
                        intent,
                        sources: Vec::new(),
                    });
                };

                let hits = search.search(question).await?;
                let content = synthesize_legal(
                    self.client.as_ref(),
                    &self.model.answer_model,
                    question,
                    &windowed,
                    &hits,
                )
                .await?;

                Ok(Answer {
                    content,
                    intent,
                    sources: hits,
                })
            }
            Intent::VagueLegalInquiry => {
                let content = synthesize_vague(
                    self.client.as_ref(),
                    &self.model.answer_model,
                    question,
                    &windowed,
                )
                .await?;
                Ok(Answer {
                    content,
                    intent,
                    sources: Vec::new(),
                })
            }
            Intent::CasualConversation => {
                let content = synthesize_casual(
                    self.client.as_ref(),
                    &self.model.answer_model,
                    question,
                    &windowed,
                )
                .await?;
                Ok(Answer {
                    content,
                    intent,
                    sources: Vec::new(),
                })
            }
        }
    }

    /// Translate display text between two named languages.
    ///
    /// Degrades to the input text on failure; see [`translate_text`].
    pub async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> String {
        translate_text(
            self.client.as_ref(),
            &self.model.fast_model,
            text,
            source_language,
            target_language,
        )
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================
