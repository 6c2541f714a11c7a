use crate::shortcode::ShortCode;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid owner id: {0}")]
    InvalidOwnerId(String),
}

/// Errors returned by [`Storage`](crate::Storage) backends.
///
/// `NotFound`, `Gone`, `Conflict`, `CodeTaken` and `DuplicateInBatch` are
/// domain outcomes the caller is expected to branch on. `Unsupported` marks
/// an operation that has no meaning for a backend. Everything else is an
/// internal failure of the underlying medium (see [`StorageError::is_internal`]).
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("short code has been deleted: {0}")]
    Gone(ShortCode),
    #[error("original url already shortened as: {0}")]
    Conflict(ShortCode),
    #[error("short code already taken: {0}")]
    CodeTaken(ShortCode),
    /// The same original URL appears more than once in one batch while
    /// original URLs must be unique.
    #[error("original url repeated within batch: {0}")]
    DuplicateInBatch(String),
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage io failed: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns `true` for failures of the underlying medium (disk, network,
    /// database) as opposed to domain outcomes.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_)
                | StorageError::Timeout(_)
                | StorageError::Query(_)
                | StorageError::InvalidData(_)
                | StorageError::Io(_)
        )
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_outcomes_are_not_internal() {
        let code = ShortCode::new_unchecked("abcd1234");
        assert!(!StorageError::NotFound("x".into()).is_internal());
        assert!(!StorageError::Gone(code.clone()).is_internal());
        assert!(!StorageError::Conflict(code.clone()).is_internal());
        assert!(!StorageError::CodeTaken(code).is_internal());
        assert!(!StorageError::DuplicateInBatch("https://a.example".into()).is_internal());
        assert!(!StorageError::Unsupported("ping").is_internal());
    }

    #[test]
    fn io_errors_are_internal() {
        let err: StorageError = std::io::Error::other("disk full").into();
        assert!(err.is_internal());
        assert!(err.to_string().contains("disk full"));
    }
}
