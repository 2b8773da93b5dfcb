//! MetadataStore — the keyed record collection backed by SQLite.
//!
//! Owns all persistence of `MetadataRecord`. The upsert is a single atomic
//! `INSERT .. ON CONFLICT .. RETURNING` statement so concurrent writers never
//! produce two rows for the same URL; `created_at` survives updates and
//! `updated_at` is stamped server-side at write time.

use crate::models::record::MetadataRecord;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Two first inserts raced and the competing row vanished before the
    /// fallback update could find it.
    #[error("upsert race unresolved for url `{0}`")]
    UnresolvedRace(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const RECORD_COLUMNS: &str =
    "url, status_code, headers, cookies, page_source, created_at, updated_at";

/// SQLite-backed store for metadata records.
#[derive(Clone)]
pub struct MetadataStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl MetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the schema statements from the bundled migration file.
    /// Idempotent; called once at startup.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let sql = include_str!("../../migrations/0001_init.sql");
        for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            debug!("executing schema statement: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Insert or update the record keyed by its `url`.
    ///
    /// - Every field except `created_at` is overwritten on update.
    /// - `created_at` is taken from the candidate only on first insert.
    /// - `updated_at` is set to the time of this write, not the candidate's.
    ///
    /// If the unique constraint on `url` still fires (two first inserts
    /// racing), the write is retried once as a plain conditional update; a
    /// fallback update that matches no row means the competing record
    /// vanished in between, which is reported as an unresolved race rather
    /// than swallowed.
    ///
    /// Returns the stored record as written, including the server-assigned
    /// `updated_at`.
    pub async fn upsert(&self, candidate: &MetadataRecord) -> StoreResult<MetadataRecord> {
        let now = Utc::now();

        let insert_result = sqlx::query_as::<_, MetadataRecord>(&format!(
            "INSERT INTO metadata ({RECORD_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(url) DO UPDATE SET
                 status_code = excluded.status_code,
                 headers = excluded.headers,
                 cookies = excluded.cookies,
                 page_source = excluded.page_source,
                 updated_at = excluded.updated_at
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(&candidate.url)
        .bind(candidate.status_code)
        .bind(&candidate.headers)
        .bind(&candidate.cookies)
        .bind(&candidate.page_source)
        .bind(candidate.created_at)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(record) => Ok(record),
            Err(err) if is_unique_violation(&err) => {
                // Race: another writer inserted first. Retry as plain update.
                let updated = sqlx::query_as::<_, MetadataRecord>(&format!(
                    "UPDATE metadata SET
                         status_code = ?,
                         headers = ?,
                         cookies = ?,
                         page_source = ?,
                         updated_at = ?
                     WHERE url = ?
                     RETURNING {RECORD_COLUMNS}"
                ))
                .bind(candidate.status_code)
                .bind(&candidate.headers)
                .bind(&candidate.cookies)
                .bind(&candidate.page_source)
                .bind(now)
                .bind(&candidate.url)
                .fetch_optional(&*self.db)
                .await?;

                updated.ok_or_else(|| StoreError::UnresolvedRace(candidate.url.clone()))
            }
            Err(err) => Err(StoreError::Sqlx(err)),
        }
    }

    /// Return the stored record for `url`, or `None` if absent.
    pub async fn find_by_url(&self, url: &str) -> StoreResult<Option<MetadataRecord>> {
        let record = sqlx::query_as::<_, MetadataRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM metadata WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    /// Lightweight connectivity probe for readiness checks.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
            .map(|_| ())
    }
}

/// Return true if a SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::types::Json;
    use std::collections::HashMap;
    use std::time::Duration;

    async fn test_store() -> MetadataStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = MetadataStore::new(Arc::new(pool));
        store.ensure_schema().await.unwrap();
        store
    }

    fn candidate(url: &str, status_code: u16) -> MetadataRecord {
        let now = Utc::now();
        MetadataRecord {
            url: url.to_string(),
            status_code,
            headers: Json(HashMap::from([(
                "content-type".to_string(),
                "text/html".to_string(),
            )])),
            cookies: Json(HashMap::new()),
            page_source: "<html></html>".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = test_store().await;
        let stored = store
            .upsert(&candidate("https://example.com/", 200))
            .await
            .unwrap();
        assert_eq!(stored.status_code, 200);

        let found = store
            .find_by_url("https://example.com/")
            .await
            .unwrap()
            .expect("record should exist");
        assert_eq!(found.url, "https://example.com/");
        assert_eq!(
            found.headers.0.get("content-type").map(String::as_str),
            Some("text/html")
        );
        assert_eq!(found.page_source, "<html></html>");
    }

    #[tokio::test]
    async fn absent_url_returns_none() {
        let store = test_store().await;
        assert!(
            store
                .find_by_url("https://missing.example/")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn repeated_upserts_keep_one_record_and_preserve_created_at() {
        let store = test_store().await;
        let url = "https://example.com/";

        let first = store.upsert(&candidate(url, 200)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.upsert(&candidate(url, 404)).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.status_code, 404);
        assert!(second.updated_at > first.updated_at);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metadata WHERE url = ?")
            .bind(url)
            .fetch_one(&*store.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn updated_at_is_assigned_by_the_store() {
        let store = test_store().await;
        let mut cand = candidate("https://example.com/", 200);
        cand.updated_at = cand.updated_at - chrono::Duration::days(30);

        let stored = store.upsert(&cand).await.unwrap();
        assert!(stored.updated_at > cand.updated_at);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn concurrent_first_inserts_resolve_to_one_record() {
        let store = test_store().await;
        let url = "https://example.com/";

        let cand_a = candidate(url, 200);
        let cand_b = candidate(url, 301);
        let (a, b) = tokio::join!(store.upsert(&cand_a), store.upsert(&cand_b));
        a.unwrap();
        b.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metadata WHERE url = ?")
            .bind(url)
            .fetch_one(&*store.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn ping_succeeds_on_live_pool() {
        let store = test_store().await;
        store.ping().await.unwrap();
    }
}
