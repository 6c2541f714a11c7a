//! URL shortener service.
//!
//! [`ShortenerService`] is the facade request handlers call. It validates
//! input, allocates codes through `shrink_generator` and hands deletions to
//! the asynchronous [`DeletePipeline`]. Core types are re-exported from
//! `shrink_core`.

pub mod deletion;
pub mod error;
pub mod service;

pub use deletion::DeletePipeline;
pub use error::{Result, ShortenerError};
pub use service::{BatchItem, BatchResult, Shortened, ShortenerService};
pub use shrink_core::{OwnerId, RequestContext, ShortCode, Stats, UserUrl};
