use crate::deletion::DeletePipeline;
use crate::error::{Result, ShortenerError};
use serde::{Deserialize, Serialize};
use shrink_core::{OwnerId, RequestContext, ShortCode, Stats, Storage, StorageError, UrlRecord, UserUrl};
use shrink_generator::{CodeAllocator, Generator};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Outcome of shortening a single URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    /// A new record was stored.
    Created(String),
    /// The URL was already stored; this is its existing short URL.
    Existing(String),
}

impl Shortened {
    pub fn short_url(&self) -> &str {
        match self {
            Shortened::Created(url) | Shortened::Existing(url) => url,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Shortened::Created(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_url: String,
}

/// The facade handlers call.
///
/// Wraps a [`Storage`] backend, a [`CodeAllocator`] and the
/// [`DeletePipeline`], and renders short URLs against `base_url`.
pub struct ShortenerService<S: ?Sized, G> {
    storage: Arc<S>,
    allocator: CodeAllocator<G>,
    deletions: DeletePipeline<S>,
    base_url: String,
}

impl<S: Storage + ?Sized, G: Generator> ShortenerService<S, G> {
    pub fn new(storage: Arc<S>, generator: G, base_url: impl Into<String>) -> Self {
        Self::with_allocator(storage, CodeAllocator::new(generator), base_url)
    }

    pub fn with_allocator(
        storage: Arc<S>,
        allocator: CodeAllocator<G>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            deletions: DeletePipeline::new(Arc::clone(&storage)),
            storage,
            allocator,
            base_url: base_url.into(),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Validates that the URL is absolute http(s) with a host.
    fn validate_url(url: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| ShortenerError::InvalidUrl(format!("{url}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShortenerError::InvalidUrl(format!(
                "scheme must be http or https: {}",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(ShortenerError::InvalidUrl(format!("missing host: {url}")));
        }

        Ok(())
    }

    fn require_owner(ctx: &RequestContext) -> Result<&OwnerId> {
        ctx.owner().ok_or(ShortenerError::Unauthenticated)
    }

    /// Shortens one URL.
    ///
    /// Submitting a URL the backend already holds (when it enforces unique
    /// original URLs) answers [`Shortened::Existing`] instead of an error.
    pub async fn shorten(&self, ctx: &RequestContext, original_url: &str) -> Result<Shortened> {
        Self::validate_url(original_url)?;

        let code = self.allocator.allocate(self.storage.as_ref()).await?;
        let record = UrlRecord::new(code.clone(), original_url, ctx.owner().cloned());

        match self.storage.put(record).await {
            Ok(()) => {
                debug!(code = %code, "url shortened");
                Ok(Shortened::Created(code.to_url(&self.base_url)))
            }
            Err(StorageError::Conflict(existing)) => {
                debug!(code = %existing, "url already shortened");
                Ok(Shortened::Existing(existing.to_url(&self.base_url)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Shortens many URLs at once; either all are stored or none.
    ///
    /// Results come back in request order.
    pub async fn shorten_batch(
        &self,
        ctx: &RequestContext,
        items: Vec<BatchItem>,
    ) -> Result<Vec<BatchResult>> {
        if items.is_empty() {
            return Err(ShortenerError::InvalidRequest("batch is empty".to_string()));
        }
        for item in &items {
            Self::validate_url(&item.original_url)?;
        }

        let codes = self
            .allocator
            .allocate_batch(self.storage.as_ref(), items.len())
            .await?;

        let owner = ctx.owner().cloned();
        let mut records = Vec::with_capacity(items.len());
        let mut results = Vec::with_capacity(items.len());
        for (item, code) in items.into_iter().zip(codes) {
            results.push(BatchResult {
                correlation_id: item.correlation_id,
                short_url: code.to_url(&self.base_url),
            });
            records.push(UrlRecord::new(code, item.original_url, owner.clone()));
        }

        self.storage.put_batch(records).await?;
        debug!(size = results.len(), "batch shortened");
        Ok(results)
    }

    pub async fn resolve(&self, code: &ShortCode) -> Result<String> {
        match self.storage.get_original(code).await {
            Err(StorageError::NotFound(_)) => Err(ShortenerError::NotFound(code.clone())),
            other => Ok(other?),
        }
    }

    /// Lists the live URLs of the context's owner; an owner with none gets
    /// an empty list.
    pub async fn urls(&self, ctx: &RequestContext) -> Result<Vec<UserUrl>> {
        let owner = Self::require_owner(ctx)?;

        match self.storage.get_urls_by_owner(owner).await {
            Err(StorageError::NotFound(_)) => Ok(Vec::new()),
            other => Ok(other?),
        }
    }

    /// Accepts codes for asynchronous deletion.
    ///
    /// Returning `Ok` only means the request was accepted; codes the owner
    /// does not hold are skipped silently later on.
    pub async fn delete_urls(&self, ctx: &RequestContext, codes: Vec<ShortCode>) -> Result<()> {
        let owner = Self::require_owner(ctx)?;
        if codes.is_empty() {
            return Err(ShortenerError::InvalidRequest("no short codes to delete".to_string()));
        }

        self.deletions.submit(owner.clone(), codes);
        Ok(())
    }

    pub async fn stats(&self) -> Result<Stats> {
        Ok(self.storage.get_stats().await?)
    }

    pub async fn ping(&self) -> Result<()> {
        Ok(self.storage.ping().await?)
    }

    /// Mints a new owner id and returns a context bound to it.
    pub fn issue_owner(&self) -> RequestContext {
        RequestContext::for_owner(self.storage.generate_owner_id())
    }

    /// Waits for pending deletions, then closes the backend.
    pub async fn shutdown(&self) -> Result<()> {
        self.deletions.drain().await;
        self.storage.close().await?;
        info!("shortener service stopped");
        Ok(())
    }
}
