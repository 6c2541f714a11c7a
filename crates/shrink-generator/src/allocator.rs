use crate::error::{GeneratorError, Result};
use crate::Generator;
use shrink_core::{ShortCode, Storage};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Default bound on candidates drawn for one code.
///
/// With 62^8 possible codes a healthy backend practically never needs a
/// second draw; hitting the bound means the backend is misbehaving.
pub const DEFAULT_MAX_ATTEMPTS: usize = 32;

/// Mints codes that are free in a specific storage backend.
#[derive(Debug, Clone)]
pub struct CodeAllocator<G> {
    generator: G,
    max_attempts: usize,
}

impl<G: Generator> CodeAllocator<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the per-code retry bound (at least one attempt is made).
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Draws candidates until one is not held by `storage`.
    ///
    /// Fails with [`GeneratorError::Exhausted`] after the retry bound and
    /// passes storage failures through unchanged.
    pub async fn allocate<S>(&self, storage: &S) -> Result<ShortCode>
    where
        S: Storage + ?Sized,
    {
        self.allocate_avoiding(storage, &HashSet::new()).await
    }

    /// Mints `count` codes that are free in `storage` and pairwise distinct.
    ///
    /// Nothing is persisted, so codes minted earlier in the same batch are
    /// tracked locally and a candidate repeating one of them is redrawn.
    pub async fn allocate_batch<S>(&self, storage: &S, count: usize) -> Result<Vec<ShortCode>>
    where
        S: Storage + ?Sized,
    {
        let mut minted = HashSet::with_capacity(count);
        let mut codes = Vec::with_capacity(count);

        while codes.len() < count {
            let code = self.allocate_avoiding(storage, &minted).await?;
            minted.insert(code.clone());
            codes.push(code);
        }

        Ok(codes)
    }

    async fn allocate_avoiding<S>(&self, storage: &S, minted: &HashSet<ShortCode>) -> Result<ShortCode>
    where
        S: Storage + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();

            if minted.contains(&candidate) {
                trace!(attempt, code = %candidate, "candidate already minted in this batch");
                continue;
            }

            if storage.exists(&candidate).await? {
                debug!(attempt, code = %candidate, "short code collision");
                continue;
            }

            return Ok(candidate);
        }

        warn!(attempts = self.max_attempts, "short code allocation exhausted");
        Err(GeneratorError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RandomGenerator, SeqGenerator};
    use async_trait::async_trait;
    use shrink_core::error::Result as StorageResult;
    use shrink_core::{
        Capabilities, OwnerId, Stats, StorageError, UrlRecord, UserUrl,
    };
    use shrink_storage::{MemoryStorage, StorageOptions};
    use std::sync::Mutex;

    fn memory() -> MemoryStorage {
        MemoryStorage::new(
            StorageOptions::builder()
                .base_url("http://localhost:8080")
                .build(),
        )
    }

    async fn store(storage: &MemoryStorage, code: &str) {
        storage
            .put(UrlRecord::new(
                ShortCode::new_unchecked(code),
                format!("https://{code}.example"),
                None,
            ))
            .await
            .unwrap();
    }

    /// Hands out a fixed list of codes, then repeats the last one.
    struct Scripted {
        codes: Mutex<Vec<&'static str>>,
    }

    impl Scripted {
        fn new(mut codes: Vec<&'static str>) -> Self {
            codes.reverse();
            Self {
                codes: Mutex::new(codes),
            }
        }
    }

    impl Generator for Scripted {
        fn generate(&self) -> ShortCode {
            let mut codes = self.codes.lock().unwrap();
            let code = if codes.len() > 1 {
                codes.pop().unwrap()
            } else {
                codes[0]
            };
            ShortCode::new_unchecked(code)
        }
    }

    /// A backend whose every call fails.
    struct Unreachable;

    #[async_trait]
    impl Storage for Unreachable {
        async fn get_original(&self, _: &ShortCode) -> StorageResult<String> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn put(&self, _: UrlRecord) -> StorageResult<()> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn put_batch(&self, _: Vec<UrlRecord>) -> StorageResult<()> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn exists(&self, _: &ShortCode) -> StorageResult<bool> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn get_urls_by_owner(&self, _: &OwnerId) -> StorageResult<Vec<UserUrl>> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn batch_delete(&self, _: &[ShortCode], _: &OwnerId) -> StorageResult<u64> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn ping(&self) -> StorageResult<()> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn close(&self) -> StorageResult<()> {
            Ok(())
        }
        async fn get_stats(&self) -> StorageResult<Stats> {
            Err(StorageError::Unavailable("down".into()))
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities {
                unique_original_urls: false,
                atomic_batches: false,
            }
        }
    }

    #[tokio::test]
    async fn skips_codes_held_by_storage() {
        let storage = memory();
        store(&storage, "sh000000").await;
        store(&storage, "sh000001").await;

        let allocator = CodeAllocator::new(SeqGenerator::with_prefix("sh"));
        let code = allocator.allocate(&storage).await.unwrap();

        assert_eq!(code.as_str(), "sh000002");
    }

    #[tokio::test]
    async fn gives_up_when_every_candidate_is_taken() {
        let storage = memory();
        store(&storage, "stuck123").await;

        let allocator = CodeAllocator::new(Scripted::new(vec!["stuck123"])).with_max_attempts(5);
        let err = allocator.allocate(&storage).await.unwrap_err();

        assert!(matches!(err, GeneratorError::Exhausted { attempts: 5 }));
    }

    #[tokio::test]
    async fn storage_failures_propagate_unchanged() {
        let allocator = CodeAllocator::new(RandomGenerator::new());
        let err = allocator.allocate(&Unreachable).await.unwrap_err();

        assert!(matches!(err, GeneratorError::Storage(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn batch_redraws_codes_minted_earlier_in_the_batch() {
        let storage = memory();
        let allocator = CodeAllocator::new(Scripted::new(vec!["dup00001", "dup00001", "uniq0002"]));

        let codes = allocator.allocate_batch(&storage, 2).await.unwrap();

        let codes: Vec<_> = codes.iter().map(ShortCode::as_str).collect();
        assert_eq!(codes, ["dup00001", "uniq0002"]);
    }

    #[tokio::test]
    async fn batch_codes_are_pairwise_distinct() {
        let storage = memory();
        let allocator = CodeAllocator::new(RandomGenerator::new());

        let codes = allocator.allocate_batch(&storage, 500).await.unwrap();

        let distinct: HashSet<_> = codes.iter().collect();
        assert_eq!(distinct.len(), 500);
    }

    #[tokio::test]
    async fn empty_batch_draws_nothing() {
        let allocator = CodeAllocator::new(RandomGenerator::new());
        let codes = allocator.allocate_batch(&Unreachable, 0).await.unwrap();
        assert!(codes.is_empty());
    }
}
