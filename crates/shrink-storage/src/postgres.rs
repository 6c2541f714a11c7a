use async_trait::async_trait;
use shrink_core::error::Result;
use shrink_core::{
    Capabilities, OwnerId, ShortCode, Stats, Storage, StorageError, UrlRecord, UserUrl,
    DELETE_CHUNK_SIZE,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, trace};

const SCHEMA: &str = include_str!("../ddl/postgres/shortener.sql");

/// PostgreSQL implementation of the storage contract.
///
/// Short codes and original URLs are both unique at the table level. `put`
/// answers a repeated original URL with `Conflict(existing_code)`,
/// `put_batch` runs in one transaction, and deletion only flips
/// `is_deleted` so tombstoned codes are never reused.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
    base_url: String,
}

impl PostgresStorage {
    /// Creates a storage from an existing connection pool.
    ///
    /// The schema is not created; call [`PostgresStorage::ensure_schema`] if needed.
    pub fn new(pool: PgPool, base_url: impl Into<String>) -> Self {
        Self {
            pool,
            base_url: base_url.into(),
        }
    }

    /// Opens a connection pool and creates the `shortener` table if missing.
    pub async fn connect(dsn: &str, base_url: impl Into<String>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(dsn)
            .await
            .map_err(map_sqlx_error)?;

        let storage = Self::new(pool, base_url);
        storage.ensure_schema().await?;
        info!("connected to postgres storage");
        Ok(storage)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn existing_code_for(&self, original_url: &str) -> Result<Option<ShortCode>> {
        let code = sqlx::query_scalar::<_, String>(
            "SELECT short_url FROM shortener WHERE original_url = $1",
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(code.map(ShortCode::new_unchecked))
    }

    /// Turns a failed batch insert into the error the caller sees.
    async fn batch_insert_error(&self, err: sqlx::Error, record: &UrlRecord) -> StorageError {
        match violated_column(&err) {
            Some(Column::ShortUrl) => StorageError::CodeTaken(record.short_code.clone()),
            Some(Column::OriginalUrl) => match self.existing_code_for(&record.original_url).await {
                Ok(Some(existing)) => StorageError::Conflict(existing),
                Ok(None) => StorageError::DuplicateInBatch(record.original_url.clone()),
                Err(lookup) => lookup,
            },
            None => map_sqlx_error(err),
        }
    }
}

enum Column {
    ShortUrl,
    OriginalUrl,
}

fn violated_column(err: &sqlx::Error) -> Option<Column> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }

    match db_err.constraint() {
        Some(name) if name.contains("original_url") => Some(Column::OriginalUrl),
        _ => Some(Column::ShortUrl),
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn get_original(&self, code: &ShortCode) -> Result<String> {
        trace!(code = %code, "postgres lookup");

        let row = sqlx::query_as::<_, (String, bool)>(
            r#"
            SELECT original_url, is_deleted
            FROM shortener
            WHERE short_url = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            None => Err(StorageError::NotFound(format!("short code {code}"))),
            Some((_, true)) => Err(StorageError::Gone(code.clone())),
            Some((original_url, false)) => Ok(original_url),
        }
    }

    async fn put(&self, record: UrlRecord) -> Result<()> {
        // The CTE's SELECT reads the snapshot taken before the INSERT, so
        // `existing` is only set when the original URL was already stored.
        let result = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            r#"
            WITH ins AS (
                INSERT INTO shortener (short_url, original_url, user_id, is_deleted)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (original_url) DO NOTHING
                RETURNING short_url
            )
            SELECT
                (SELECT short_url FROM ins) AS inserted,
                (SELECT short_url FROM shortener WHERE original_url = $2) AS existing
            "#,
        )
        .bind(record.short_code.as_str())
        .bind(&record.original_url)
        .bind(record.owner.as_ref().map(OwnerId::as_str))
        .bind(record.deleted)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((Some(_), _)) => {
                debug!(code = %record.short_code, "postgres insert");
                Ok(())
            }
            Ok((None, Some(existing))) => Err(StorageError::Conflict(ShortCode::new_unchecked(existing))),
            // Skipped by ON CONFLICT against a row committed after our snapshot.
            Ok((None, None)) => match self.existing_code_for(&record.original_url).await? {
                Some(existing) => Err(StorageError::Conflict(existing)),
                None => Err(StorageError::Query(format!(
                    "insert of {} was skipped without a conflicting row",
                    record.short_code
                ))),
            },
            Err(err) if matches!(violated_column(&err), Some(Column::ShortUrl)) => {
                Err(StorageError::CodeTaken(record.short_code))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn put_batch(&self, records: Vec<UrlRecord>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for record in &records {
            let result = sqlx::query(
                r#"
                INSERT INTO shortener (short_url, original_url, user_id, is_deleted)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(record.short_code.as_str())
            .bind(&record.original_url)
            .bind(record.owner.as_ref().map(OwnerId::as_str))
            .bind(record.deleted)
            .execute(&mut *tx)
            .await;

            if let Err(err) = result {
                tx.rollback().await.map_err(map_sqlx_error)?;
                return Err(self.batch_insert_error(err, record).await);
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(size = records.len(), "postgres batch insert");
        Ok(())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM shortener WHERE short_url = $1)")
            .bind(code.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn get_urls_by_owner(&self, owner: &OwnerId) -> Result<Vec<UserUrl>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT short_url, original_url
            FROM shortener
            WHERE user_id = $1
              AND is_deleted = FALSE
            ORDER BY id
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if rows.is_empty() {
            return Err(StorageError::NotFound(format!("no urls for owner {owner}")));
        }

        Ok(rows
            .into_iter()
            .map(|(short_url, original_url)| UserUrl {
                short_url: ShortCode::new_unchecked(short_url).to_url(&self.base_url),
                original_url,
            })
            .collect())
    }

    async fn batch_delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<u64> {
        let mut deleted = 0;

        for chunk in codes.chunks(DELETE_CHUNK_SIZE) {
            let chunk: Vec<String> = chunk.iter().map(|code| code.as_str().to_owned()).collect();
            let result = sqlx::query(
                r#"
                UPDATE shortener
                SET is_deleted = TRUE
                WHERE short_url = ANY($1)
                  AND user_id = $2
                  AND is_deleted = FALSE
                "#,
            )
            .bind(chunk)
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            deleted += result.rows_affected();
        }

        debug!(owner = %owner, requested = codes.len(), deleted, "postgres batch delete");
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        info!("postgres storage closed");
        Ok(())
    }

    async fn get_stats(&self) -> Result<Stats> {
        let (urls, users) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM shortener",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Stats {
            urls: urls as u64,
            users: users as u64,
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            unique_original_urls: true,
            atomic_batches: true,
        }
    }
}
