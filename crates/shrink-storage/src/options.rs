use std::path::PathBuf;
use typed_builder::TypedBuilder;

/// Options shared by every backend.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StorageOptions {
    /// Public base URL used to render short URLs for owner listings.
    #[builder(setter(into))]
    pub base_url: String,
    /// Reject a second mapping for an already stored original URL with
    /// `Conflict(existing_code)`.
    ///
    /// The relational backend always enforces this through a table
    /// constraint; the in-process backends only when enabled.
    #[builder(default = false)]
    pub unique_original_urls: bool,
}

/// Location and durability settings of the file journal.
#[derive(Debug, Clone, TypedBuilder)]
pub struct JournalOptions {
    #[builder(setter(into))]
    pub path: PathBuf,
    /// Call `sync_data` after every append.
    #[builder(default = false)]
    pub sync: bool,
}
