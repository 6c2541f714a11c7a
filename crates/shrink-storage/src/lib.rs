//! Storage backends for the Shrink URL shortener.
//!
//! Three interchangeable implementations of [`Storage`]: an in-process
//! [`MemoryStorage`], a [`JournalStorage`] that mirrors records to an
//! append-only JSON-lines file, and a [`PostgresStorage`]. Use
//! [`open_storage`] to pick one from configuration.

pub mod factory;
pub mod journal;
pub mod memory;
pub mod options;
pub mod postgres;
mod records;

pub use factory::{open_storage, Backend, StorageConfig};
pub use journal::JournalStorage;
pub use memory::MemoryStorage;
pub use options::{JournalOptions, StorageOptions};
pub use postgres::PostgresStorage;
pub use shrink_core::error::Result;
pub use shrink_core::{Storage, StorageError};
