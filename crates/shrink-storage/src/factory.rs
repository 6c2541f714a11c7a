use crate::journal::JournalStorage;
use crate::memory::MemoryStorage;
use crate::options::{JournalOptions, StorageOptions};
use crate::postgres::PostgresStorage;
use shrink_core::error::Result;
use shrink_core::Storage;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which backend to construct.
#[derive(Debug, Clone)]
pub enum Backend {
    Memory,
    File(JournalOptions),
    Postgres { dsn: String },
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::File(_) => write!(f, "file"),
            Backend::Postgres { .. } => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: Backend,
    pub options: StorageOptions,
}

/// Constructs the configured backend.
pub async fn open_storage(config: StorageConfig) -> Result<Arc<dyn Storage>> {
    debug!(backend = %config.backend, "opening storage");

    let storage: Arc<dyn Storage> = match config.backend {
        Backend::Memory => Arc::new(MemoryStorage::new(config.options)),
        Backend::File(journal) => Arc::new(JournalStorage::open(journal, config.options).await?),
        Backend::Postgres { dsn } => {
            if !config.options.unique_original_urls {
                warn!("postgres storage always enforces unique original urls");
            }
            Arc::new(PostgresStorage::connect(&dsn, config.options.base_url).await?)
        }
    };

    Ok(storage)
}
