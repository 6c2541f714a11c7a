use crate::options::StorageOptions;
use crate::records::RecordSet;
use async_trait::async_trait;
use parking_lot::RwLock;
use shrink_core::error::Result;
use shrink_core::{
    Capabilities, OwnerId, ShortCode, Stats, Storage, StorageError, UrlRecord, UserUrl,
};
use tracing::{debug, trace};

/// In-process implementation of the [`Storage`] contract.
///
/// Records live in an append-only collection behind a single lock and are
/// lost when the process exits. Short codes are always unique; original URLs
/// only when [`StorageOptions::unique_original_urls`] is set.
#[derive(Debug)]
pub struct MemoryStorage {
    records: RwLock<RecordSet>,
    options: StorageOptions,
}

impl MemoryStorage {
    /// Creates an empty in-memory storage.
    pub fn new(options: StorageOptions) -> Self {
        Self {
            records: RwLock::new(RecordSet::default()),
            options,
        }
    }

    /// Number of stored records, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_original(&self, code: &ShortCode) -> Result<String> {
        trace!(code = %code, "memory lookup");
        self.records.read().get_original(code)
    }

    async fn put(&self, record: UrlRecord) -> Result<()> {
        let mut records = self.records.write();
        records.check_insert(&record, self.options.unique_original_urls)?;
        debug!(code = %record.short_code, "memory insert");
        records.insert(record);
        Ok(())
    }

    async fn put_batch(&self, batch: Vec<UrlRecord>) -> Result<()> {
        let mut records = self.records.write();
        records.check_batch(&batch, self.options.unique_original_urls)?;
        debug!(size = batch.len(), "memory batch insert");
        for record in batch {
            records.insert(record);
        }
        Ok(())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.records.read().contains(code))
    }

    async fn get_urls_by_owner(&self, owner: &OwnerId) -> Result<Vec<UserUrl>> {
        self.records.read().owned_by(owner, &self.options.base_url)
    }

    async fn batch_delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<u64> {
        let mut records = self.records.write();
        let positions = records.deletable(codes, owner);
        records.mark_deleted(&positions);
        debug!(owner = %owner, requested = codes.len(), deleted = positions.len(), "memory batch delete");
        Ok(positions.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Err(StorageError::Unsupported("ping is not supported for memory storage"))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn get_stats(&self) -> Result<Stats> {
        Ok(self.records.read().stats())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            unique_original_urls: self.options.unique_original_urls,
            atomic_batches: true,
        }
    }
}
