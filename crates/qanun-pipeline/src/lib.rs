//! Qanun Pipeline crate - intent-routed answer generation for legal chat.
//!
//! Provides the completion client for OpenAI-compatible endpoints, regex
//! memory extraction with history windowing, intent classification, trusted
//! source search, the three response synthesis strategies, translation, and
//! the orchestrator that wires them into one entry point.

pub mod completion;
pub mod error;
pub mod intent;
pub mod memory;
pub mod orchestrator;
pub mod search;
pub mod synthesis;
pub mod translate;

pub use completion::{ChatMessage, CompletionClient, CompletionRequest, MockCompletion, OpenAiClient};
pub use error::{PipelineError, Result};
pub use intent::classify_intent;
pub use memory::{window_history, MemoryExtract, RegexMemoryExtractor};
pub use orchestrator::{Answer, AnswerOrchestrator};
pub use search::{GoogleCseSearch, MockSearch, SourceSearch};
pub use synthesis::{synthesize_casual, synthesize_legal, synthesize_vague, NO_SOURCE_NOTICE, SEARCH_UNCONFIGURED_NOTICE};
pub use translate::translate_text;
