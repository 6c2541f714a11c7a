use crate::error::Result;
use crate::owner::OwnerId;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maximum number of codes tombstoned by a single backend mutation.
pub const DELETE_CHUNK_SIZE: usize = 10;

/// A stored URL mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Unique, immutable identifier of the mapping.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// The principal that created the mapping, if any.
    pub owner: Option<OwnerId>,
    /// Tombstone flag. Deleted records are kept for statistics only.
    pub deleted: bool,
}

impl UrlRecord {
    /// Creates a live record.
    pub fn new(short_code: ShortCode, original_url: impl Into<String>, owner: Option<OwnerId>) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            owner,
            deleted: false,
        }
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        self.owner.as_ref() == Some(owner)
    }
}

/// A record as shown to its owner, with the externally addressable short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

/// Aggregate counters over a backend's full record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of records, tombstoned ones included.
    pub urls: u64,
    /// Number of distinct owners.
    pub users: u64,
}

/// Behaviour that differs between backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `put` answers `Conflict(existing)` when the original URL is already stored.
    pub unique_original_urls: bool,
    /// `put_batch` leaves nothing visible when it fails.
    pub atomic_batches: bool,
}

/// The contract every storage backend satisfies.
///
/// Backends own their record set exclusively and must be safe under
/// concurrent calls. Records are never physically removed: `batch_delete`
/// only sets the tombstone flag.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Resolves a short code to its original URL.
    ///
    /// Fails with `NotFound` if the code was never stored and with `Gone` if
    /// it has been tombstoned.
    async fn get_original(&self, code: &ShortCode) -> Result<String>;

    /// Stores a single record.
    ///
    /// Fails with `CodeTaken` if the short code is already in use and, on
    /// backends that enforce original-URL uniqueness, with
    /// `Conflict(existing_code)` if the URL is already shortened.
    async fn put(&self, record: UrlRecord) -> Result<()>;

    /// Stores records in order.
    ///
    /// The whole batch is validated before any record is applied. Whether a
    /// failure while applying can leave a prefix visible is reported by
    /// [`Capabilities::atomic_batches`].
    async fn put_batch(&self, records: Vec<UrlRecord>) -> Result<()>;

    /// Checks whether a short code is held by any record, tombstoned or not.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Lists the live records of an owner.
    ///
    /// Fails with `NotFound` when the owner has none; callers should treat
    /// that as an empty result.
    async fn get_urls_by_owner(&self, owner: &OwnerId) -> Result<Vec<UserUrl>>;

    /// Tombstones the codes that belong to `owner`, skipping the rest.
    ///
    /// Returns how many records were newly tombstoned.
    async fn batch_delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<u64>;

    /// Liveness check. Backends without a remote store answer `Unsupported`.
    async fn ping(&self) -> Result<()>;

    /// Releases the backend's resources.
    async fn close(&self) -> Result<()>;

    async fn get_stats(&self) -> Result<Stats>;

    fn capabilities(&self) -> Capabilities;

    /// Issues an id for a new owner.
    fn generate_owner_id(&self) -> OwnerId {
        OwnerId::generate()
    }
}
