//! Runs against a disposable PostgreSQL container; needs a container runtime.
//! Run with `cargo test -p shrink-storage -- --ignored`.

use std::time::Duration;

use shrink_core::{OwnerId, ShortCode, Stats, UrlRecord};
use shrink_storage::{PostgresStorage, Storage, StorageError};
use shrink_test_infra::postgres::PostgresServer;
use sqlx::postgres::PgPoolOptions;

const BASE_URL: &str = "http://localhost:8080";

struct Fixture {
    _postgres: PostgresServer,
    storage: PostgresStorage,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::start().await.expect("start postgres");
        let pool = connect_with_retry(postgres.database_url()).await;

        let storage = PostgresStorage::new(pool, BASE_URL);
        storage.ensure_schema().await.expect("create schema");

        Self {
            _postgres: postgres,
            storage,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::PgPool {
    let mut last_error = None;

    for _ in 0..20 {
        match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn owner(value: &str) -> OwnerId {
    OwnerId::new(value).unwrap()
}

fn record(c: &str, url: &str, o: Option<&str>) -> UrlRecord {
    UrlRecord::new(code(c), url, o.map(owner))
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn put_and_get_round_trip() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .put(record("abcd1234", "https://example.com", Some("u1")))
        .await
        .unwrap();

    let got = fixture.storage.get_original(&code("abcd1234")).await.unwrap();
    assert_eq!(got, "https://example.com");
    assert!(fixture.storage.exists(&code("abcd1234")).await.unwrap());
    assert!(!fixture.storage.exists(&code("zzzz9999")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn second_put_of_same_url_returns_existing_code() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .put(record("first111", "https://example.com", None))
        .await
        .unwrap();

    let err = fixture
        .storage
        .put(record("second22", "https://example.com", None))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(existing) if existing.as_str() == "first111"));
    assert!(!fixture.storage.exists(&code("second22")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn put_with_taken_code_fails() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .put(record("abcd1234", "https://one.example", None))
        .await
        .unwrap();

    let err = fixture
        .storage
        .put(record("abcd1234", "https://two.example", None))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::CodeTaken(_)));
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn failed_batch_leaves_nothing_behind() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .put(record("existing", "https://dup.example", None))
        .await
        .unwrap();

    let batch = vec![
        record("batch001", "https://one.example", None),
        record("batch002", "https://two.example", None),
        record("batch003", "https://dup.example", None),
        record("batch004", "https://four.example", None),
        record("batch005", "https://five.example", None),
    ];
    let err = fixture.storage.put_batch(batch).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(existing) if existing.as_str() == "existing"));

    for c in ["batch001", "batch002", "batch003", "batch004", "batch005"] {
        assert!(!fixture.storage.exists(&code(c)).await.unwrap(), "{c} leaked");
    }
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn batch_delete_is_owner_scoped() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .put_batch(vec![
            record("mine0001", "https://a.example", Some("u1")),
            record("theirs01", "https://b.example", Some("u2")),
        ])
        .await
        .unwrap();

    let deleted = fixture
        .storage
        .batch_delete(&[code("mine0001"), code("theirs01")], &owner("u1"))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let err = fixture
        .storage
        .get_original(&code("mine0001"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Gone(_)));
    assert_eq!(
        fixture.storage.get_original(&code("theirs01")).await.unwrap(),
        "https://b.example"
    );

    // Tombstoned codes are never handed out again.
    assert!(fixture.storage.exists(&code("mine0001")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn urls_by_owner_and_stats() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .put_batch(vec![
            record("aaaa1111", "https://a.example", Some("u1")),
            record("bbbb2222", "https://b.example", Some("u1")),
            record("cccc3333", "https://c.example", Some("u2")),
            record("dddd4444", "https://d.example", None),
        ])
        .await
        .unwrap();
    fixture
        .storage
        .batch_delete(&[code("bbbb2222")], &owner("u1"))
        .await
        .unwrap();

    let urls = fixture.storage.get_urls_by_owner(&owner("u1")).await.unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].short_url, "http://localhost:8080/aaaa1111");

    let err = fixture
        .storage
        .get_urls_by_owner(&owner("nobody"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));

    assert_eq!(
        fixture.storage.get_stats().await.unwrap(),
        Stats { urls: 4, users: 2 }
    );
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn ping_reaches_the_database() {
    let fixture = Fixture::start().await;

    fixture.storage.ping().await.unwrap();
    fixture.storage.close().await.unwrap();

    assert!(fixture.storage.ping().await.is_err());
}
