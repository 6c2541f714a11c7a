use shrink_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    /// Every candidate drawn within the retry bound was already taken.
    #[error("no free short code after {attempts} attempts")]
    Exhausted { attempts: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
