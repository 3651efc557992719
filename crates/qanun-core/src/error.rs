use thiserror::Error;

/// Top-level error type for the Qanun system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for QanunError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QanunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<toml::de::Error> for QanunError {
    fn from(err: toml::de::Error) -> Self {
        QanunError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for QanunError {
    fn from(err: toml::ser::Error) -> Self {
        QanunError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for QanunError {
    fn from(err: serde_json::Error) -> Self {
        QanunError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Qanun operations.
pub type Result<T> = std::result::Result<T, QanunError>;
