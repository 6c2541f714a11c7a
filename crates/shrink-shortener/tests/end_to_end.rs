use shrink_core::{OwnerId, ShortCode, Storage, StorageError, UrlRecord};
use shrink_generator::RandomGenerator;
use shrink_shortener::{RequestContext, ShortenerError, ShortenerService};
use shrink_storage::{MemoryStorage, StorageOptions};
use std::sync::Arc;

const BASE_URL: &str = "http://localhost:8080";

fn memory() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new(
        StorageOptions::builder().base_url(BASE_URL).build(),
    ))
}

#[tokio::test]
async fn stored_record_is_resolved_then_tombstoned() {
    let storage = memory();
    let owner = OwnerId::new("u1").unwrap();
    let code = ShortCode::new("abcd1234").unwrap();

    storage
        .put(UrlRecord::new(
            code.clone(),
            "https://example.com",
            Some(owner.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(
        storage.get_original(&code).await.unwrap(),
        "https://example.com"
    );

    let service = ShortenerService::new(Arc::clone(&storage), RandomGenerator::new(), BASE_URL);
    service
        .delete_urls(&RequestContext::for_owner(owner), vec![code.clone()])
        .await
        .unwrap();
    service.shutdown().await.unwrap();

    assert!(matches!(
        storage.get_original(&code).await,
        Err(StorageError::Gone(_))
    ));
    assert!(matches!(
        service.resolve(&code).await,
        Err(ShortenerError::Gone(_))
    ));
}

#[tokio::test]
async fn issued_owner_lists_only_its_own_urls() {
    let service = ShortenerService::new(memory(), RandomGenerator::new(), BASE_URL);
    let alice = service.issue_owner();
    let bob = service.issue_owner();

    let short = service.shorten(&alice, "https://alice.example").await.unwrap();
    service.shorten(&bob, "https://bob.example").await.unwrap();

    let urls = service.urls(&alice).await.unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].short_url, short.short_url());
    assert_eq!(urls[0].original_url, "https://alice.example");
    assert!(urls[0].short_url.starts_with("http://localhost:8080/"));
}

#[tokio::test]
async fn generated_codes_are_distinct() {
    let service = ShortenerService::new(memory(), RandomGenerator::new(), BASE_URL);
    let ctx = RequestContext::anonymous();

    let mut seen = std::collections::HashSet::new();
    for i in 0..100 {
        let short = service
            .shorten(&ctx, &format!("https://example.com/{i}"))
            .await
            .unwrap();
        assert!(seen.insert(short.short_url().to_string()));
    }
    assert_eq!(service.stats().await.unwrap().urls, 100);
}
