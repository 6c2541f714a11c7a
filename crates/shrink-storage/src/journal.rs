use crate::options::{JournalOptions, StorageOptions};
use crate::records::RecordSet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shrink_core::error::Result;
use shrink_core::{
    Capabilities, OwnerId, ShortCode, Stats, Storage, StorageError, UrlRecord, UserUrl,
};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

/// One line of the journal file.
#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    short_url: String,
    original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_deleted: bool,
}

impl From<&UrlRecord> for JournalEntry {
    fn from(record: &UrlRecord) -> Self {
        Self {
            short_url: record.short_code.as_str().to_owned(),
            original_url: record.original_url.clone(),
            user_id: record.owner.as_ref().map(|owner| owner.as_str().to_owned()),
            is_deleted: record.deleted,
        }
    }
}

impl JournalEntry {
    fn into_record(self) -> UrlRecord {
        UrlRecord {
            short_code: ShortCode::new_unchecked(self.short_url),
            original_url: self.original_url,
            // Older lines may carry an empty id for anonymous inserts.
            owner: self.user_id.and_then(|id| OwnerId::new(id).ok()),
            deleted: self.is_deleted,
        }
    }
}

#[derive(Debug)]
struct JournalState {
    // `None` once the storage has been closed or a failed append could not
    // be rolled back.
    file: Option<File>,
    failed: bool,
    records: RecordSet,
}

impl JournalState {
    fn writable(&mut self) -> Result<&mut File> {
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None if self.failed => Err(StorageError::Unavailable(
                "journal stopped accepting writes after a failed append".to_string(),
            )),
            None => Err(StorageError::Unavailable("journal is closed".to_string())),
        }
    }
}

/// File-backed implementation of the [`Storage`] contract.
///
/// Every mutation is appended to the journal as newline-delimited JSON
/// before the in-memory record set changes, so an acknowledged write is
/// always on disk. Opening the storage replays the whole journal. Tombstones
/// are journaled as a repeated line with `is_deleted: true`. There is no
/// compaction.
///
/// A batch goes out as one buffered append and a failed append is cut back
/// off the file, but a crash in the middle of the write can still leave a
/// prefix of the batch durable. [`Storage::capabilities`] therefore reports
/// batches as non-atomic.
#[derive(Debug)]
pub struct JournalStorage {
    path: PathBuf,
    sync: bool,
    options: StorageOptions,
    state: Mutex<JournalState>,
}

impl JournalStorage {
    /// Opens (or creates) the journal and rebuilds the record set from it.
    pub async fn open(journal: JournalOptions, options: StorageOptions) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&journal.path)
            .await?;

        let records = replay(&mut file, &journal.path).await?;
        info!(
            path = %journal.path.display(),
            records = records.len(),
            "journal replayed"
        );

        Ok(Self {
            path: journal.path,
            sync: journal.sync,
            options,
            state: Mutex::new(JournalState {
                file: Some(file),
                failed: false,
                records,
            }),
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `records` as a single write.
    ///
    /// When the write fails the file is truncated back to its previous
    /// length, so neither a partial line nor lines of a rejected batch stay
    /// behind. If the truncation fails too, the journal stops accepting
    /// writes.
    async fn append(&self, state: &mut JournalState, records: &[UrlRecord]) -> Result<()> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, &JournalEntry::from(record))
                .map_err(|e| StorageError::InvalidData(format!("encode journal entry: {e}")))?;
            buf.push(b'\n');
        }

        let file = state.writable()?;
        let start = file.metadata().await?.len();

        let Err(err) = write_lines(file, &buf, self.sync).await else {
            trace!(lines = records.len(), bytes = buf.len(), "journal append");
            return Ok(());
        };

        let rollback = file.set_len(start).await;
        match rollback {
            Ok(()) => warn!(
                path = %self.path.display(),
                error = %err,
                "journal append failed, file rolled back"
            ),
            Err(rollback_err) => {
                error!(
                    path = %self.path.display(),
                    error = %err,
                    rollback_error = %rollback_err,
                    "journal append failed and could not be rolled back"
                );
                state.file = None;
                state.failed = true;
            }
        }

        Err(err.into())
    }
}

async fn write_lines(file: &mut File, buf: &[u8], sync: bool) -> std::io::Result<()> {
    file.write_all(buf).await?;
    file.flush().await?;
    if sync {
        file.sync_data().await?;
    }
    Ok(())
}

/// Reads the journal front to back.
///
/// A malformed final line without a trailing newline is a torn append from a
/// crash: it is truncated away. A malformed line anywhere else is an error.
/// Lines are parsed as bytes, since a torn append may end inside a multi-byte
/// character.
async fn replay(file: &mut File, path: &Path) -> Result<RecordSet> {
    let mut content = Vec::new();
    file.read_to_end(&mut content).await?;

    let mut records = RecordSet::default();
    let complete_len = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |idx| idx + 1);

    for (idx, line) in content[..complete_len].split(|&b| b == b'\n').enumerate() {
        if line.trim_ascii().is_empty() {
            continue;
        }
        let entry: JournalEntry = serde_json::from_slice(line).map_err(|e| {
            StorageError::InvalidData(format!(
                "{} line {}: {e}",
                path.display(),
                idx + 1
            ))
        })?;
        records.replay(entry.into_record());
    }

    let tail = &content[complete_len..];
    if !tail.trim_ascii().is_empty() {
        match serde_json::from_slice::<JournalEntry>(tail) {
            Ok(entry) => {
                records.replay(entry.into_record());
                file.write_all(b"\n").await?;
                file.flush().await?;
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    bytes = tail.len(),
                    error = %err,
                    "dropping torn journal tail"
                );
                file.set_len(complete_len as u64).await?;
            }
        }
    }

    Ok(records)
}

#[async_trait]
impl Storage for JournalStorage {
    async fn get_original(&self, code: &ShortCode) -> Result<String> {
        self.state.lock().await.records.get_original(code)
    }

    async fn put(&self, record: UrlRecord) -> Result<()> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state
            .records
            .check_insert(&record, self.options.unique_original_urls)?;
        self.append(state, std::slice::from_ref(&record)).await?;

        debug!(code = %record.short_code, "journal insert");
        state.records.insert(record);
        Ok(())
    }

    async fn put_batch(&self, batch: Vec<UrlRecord>) -> Result<()> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state
            .records
            .check_batch(&batch, self.options.unique_original_urls)?;
        self.append(state, &batch).await?;

        debug!(size = batch.len(), "journal batch insert");
        for record in batch {
            state.records.insert(record);
        }
        Ok(())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.state.lock().await.records.contains(code))
    }

    async fn get_urls_by_owner(&self, owner: &OwnerId) -> Result<Vec<UserUrl>> {
        self.state
            .lock()
            .await
            .records
            .owned_by(owner, &self.options.base_url)
    }

    async fn batch_delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<u64> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let positions = state.records.deletable(codes, owner);
        if positions.is_empty() {
            return Ok(0);
        }

        let tombstones = state.records.tombstones(&positions);
        self.append(state, &tombstones).await?;
        state.records.mark_deleted(&positions);

        debug!(owner = %owner, requested = codes.len(), deleted = positions.len(), "journal batch delete");
        Ok(positions.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Err(StorageError::Unsupported("ping is not supported for file storage"))
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(mut file) = state.file.take() {
            file.flush().await?;
            file.sync_all().await?;
            info!(path = %self.path.display(), "journal closed");
        }
        Ok(())
    }

    async fn get_stats(&self) -> Result<Stats> {
        Ok(self.state.lock().await.records.stats())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            unique_original_urls: self.options.unique_original_urls,
            atomic_batches: false,
        }
    }
}
