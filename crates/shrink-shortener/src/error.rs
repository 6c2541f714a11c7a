use shrink_core::{CoreError, ShortCode, StorageError};
use shrink_generator::GeneratorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request has no owner")]
    Unauthenticated,
    #[error("short code not found: {0}")]
    NotFound(ShortCode),
    #[error("short code was deleted: {0}")]
    Gone(ShortCode),
    /// The original URL is already stored under another code.
    #[error("url already shortened as {0}")]
    Conflict(ShortCode),
    #[error("no free short code after {attempts} attempts")]
    Exhausted { attempts: usize },
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Gone(code) => Self::Gone(code),
            StorageError::Conflict(code) => Self::Conflict(code),
            StorageError::DuplicateInBatch(url) => {
                Self::InvalidRequest(format!("original url repeated within batch: {url}"))
            }
            other => Self::Storage(other),
        }
    }
}

impl From<GeneratorError> for ShortenerError {
    fn from(value: GeneratorError) -> Self {
        match value {
            GeneratorError::Exhausted { attempts } => Self::Exhausted { attempts },
            GeneratorError::Storage(err) => err.into(),
        }
    }
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) | CoreError::InvalidOwnerId(message) => {
                Self::InvalidRequest(message)
            }
        }
    }
}
