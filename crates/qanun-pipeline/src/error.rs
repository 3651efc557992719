//! Error types for the answer pipeline.

use qanun_core::QanunError;

/// Errors from the model, search, and synthesis stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required credential or endpoint is missing.
    #[error("configuration error: {0}")]
    Config(String),
    /// A completion call failed in transit or at the endpoint.
    #[error("completion error: {0}")]
    Completion(String),
    /// The trusted-source search failed.
    #[error("search error: {0}")]
    Search(String),
    /// A response strategy failed to produce an answer.
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    /// The endpoint answered in a shape the pipeline cannot use.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl From<PipelineError> for QanunError {
    fn from(err: PipelineError) -> Self {
        QanunError::Pipeline(err.to_string())
    }
}

/// A specialized `Result` type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
