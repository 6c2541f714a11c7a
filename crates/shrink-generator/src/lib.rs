//! Short code generation.
//!
//! [`Generator`]s are pure and never look at storage. [`CodeAllocator`]
//! pairs a generator with a [`Storage`](shrink_core::Storage) backend and
//! keeps drawing until it finds a code the backend does not hold.

pub mod allocator;
pub mod error;
pub mod random;
pub mod seq;

pub use allocator::CodeAllocator;
pub use error::{GeneratorError, Result};
pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use shrink_core::ShortCode;

/// Trait for generating candidate short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness against stored codes is the allocator's job.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self) -> ShortCode;
}
