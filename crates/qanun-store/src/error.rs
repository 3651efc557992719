//! Error types for the storage layer.

use qanun_core::QanunError;

/// Errors from the entity stores and their backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing medium failed (I/O, encoding, rename).
    #[error("backend error: {0}")]
    Backend(String),
    /// A persisted record exists but could not be decoded.
    #[error("corrupt record {namespace}/{id}: {reason}")]
    Corrupt {
        namespace: String,
        id: String,
        reason: String,
    },
    /// Caller-supplied data failed validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<StoreError> for QanunError {
    fn from(err: StoreError) -> Self {
        QanunError::Storage(err.to_string())
    }
}

/// A specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Backend("disk full".to_string());
        assert_eq!(err.to_string(), "backend error: disk full");

        let err = StoreError::Corrupt {
            namespace: "chats".to_string(),
            id: "1724500000000".to_string(),
            reason: "unexpected end of input".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt record chats/1724500000000: unexpected end of input"
        );

        let err = StoreError::Validation("invalid email format".to_string());
        assert_eq!(err.to_string(), "validation error: invalid email format");

        let err = StoreError::Conflict("username is already taken".to_string());
        assert_eq!(err.to_string(), "conflict: username is already taken");
    }

    #[test]
    fn test_store_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_qanun_error_from_store_error() {
        let err = StoreError::Conflict("email is already registered".to_string());
        let core_err: QanunError = err.into();
        assert!(matches!(core_err, QanunError::Storage(_)));
        assert!(core_err.to_string().contains("email is already registered"));
    }
}
