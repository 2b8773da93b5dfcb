//! MetadataService — composes the retrying fetcher with the upsert store.
//!
//! `store_metadata` is the synchronous path: either error kind propagates to
//! the caller unmodified. `background_collect` is the fire-and-forget path
//! used when a read miss triggers population: every failure is caught, logged
//! with context, and discarded, because the spawning request has no channel
//! left to report into.

use crate::config::AppConfig;
use crate::fetch::{FetchClient, FetchError, fetch_with_retry};
use crate::models::record::MetadataRecord;
use crate::store::{MetadataStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Failure of a synchronous metadata operation.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Business logic for metadata collection and retrieval.
#[derive(Clone)]
pub struct MetadataService {
    pub store: MetadataStore,
    fetcher: Arc<FetchClient>,
    config: Arc<AppConfig>,
}

impl MetadataService {
    pub fn new(store: MetadataStore, fetcher: Arc<FetchClient>, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Return the cached record for `url`, or `None` if not stored.
    /// Never fetches.
    pub async fn get_metadata(&self, url: &str) -> Result<Option<MetadataRecord>, MetadataError> {
        Ok(self.store.find_by_url(url).await?)
    }

    /// Fetch live metadata for `url` and persist it.
    ///
    /// Returns the record as written to the database, with the store-assigned
    /// `updated_at`. The retry policy is read from config at the start of
    /// each call, not captured at startup.
    pub async fn store_metadata(&self, url: &str) -> Result<MetadataRecord, MetadataError> {
        let candidate = fetch_with_retry(&self.fetcher, url, self.config.retry_policy()).await?;
        let stored = self.store.upsert(&candidate).await?;
        Ok(stored)
    }

    /// Fire-and-forget variant of [`store_metadata`](Self::store_metadata).
    ///
    /// Catches and logs every failure so a network or database problem never
    /// escapes the detached task that runs it. Fetch failures are expected
    /// noise and log at warn; store failures log at error.
    pub async fn background_collect(&self, url: String) {
        match self.store_metadata(&url).await {
            Ok(record) => {
                tracing::debug!(url = %url, status = record.status_code, "background collection stored metadata");
            }
            Err(MetadataError::Fetch(err)) => {
                tracing::warn!(url = %url, error = %err, "background fetch failed");
            }
            Err(MetadataError::Store(err)) => {
                tracing::error!(url = %url, error = %err, "background persist failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::client::HttpSettings;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;

    async fn test_service() -> MetadataService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = MetadataStore::new(Arc::new(pool));
        store.ensure_schema().await.unwrap();

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "sqlite::memory:".into(),
            http_timeout_secs: 1.0,
            http_max_retries: 0,
            http_verify_tls: true,
            retry_min_backoff_ms: 1,
            retry_max_backoff_ms: 2,
        });
        let fetcher = Arc::new(FetchClient::new(HttpSettings {
            timeout: Duration::from_secs(1),
            verify_tls: true,
        }));

        MetadataService::new(store, fetcher, config)
    }

    #[tokio::test]
    async fn invalid_url_fails_synchronously_and_writes_nothing() {
        let service = test_service().await;

        let result = service.store_metadata("not a url").await;
        assert!(matches!(
            result,
            Err(MetadataError::Fetch(FetchError::InvalidUrl { .. }))
        ));

        assert!(
            service
                .get_metadata("not a url")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn background_collect_swallows_fetch_failures() {
        let service = test_service().await;
        // Returns unit even though the underlying fetch fails permanently.
        service.background_collect("not a url".to_string()).await;
    }

    #[tokio::test]
    async fn get_metadata_never_fetches() {
        let service = test_service().await;
        // A URL that was never stored stays absent; no implicit collection.
        let found = service.get_metadata("https://example.com/").await.unwrap();
        assert!(found.is_none());
        let again = service.get_metadata("https://example.com/").await.unwrap();
        assert!(again.is_none());
    }
}
