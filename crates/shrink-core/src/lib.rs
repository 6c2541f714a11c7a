//! Core types and traits for the Shrink URL shortener.
//!
//! This crate holds the record model, the [`Storage`] capability trait every
//! backend implements, and the error taxonomy shared by the storage backends,
//! the code generator and the shortener service.

pub mod context;
pub mod error;
pub mod owner;
pub mod shortcode;
pub mod storage;

pub use context::RequestContext;
pub use error::{CoreError, StorageError};
pub use owner::OwnerId;
pub use shortcode::ShortCode;
pub use storage::{Capabilities, Stats, Storage, UrlRecord, UserUrl, DELETE_CHUNK_SIZE};
