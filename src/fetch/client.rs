//! Single-attempt HTTP fetcher.
//!
//! Owns the shared `reqwest::Client` connection pool. The inner client is
//! created lazily on first use, reused across all calls, and can be closed
//! explicitly at shutdown; a closed handle transparently rebuilds the client
//! on the next fetch. No retries happen at this level — see [`super::retry`].

use crate::models::record::MetadataRecord;
use chrono::Utc;
use sqlx::types::Json;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

const USER_AGENT: &str = "MetadataInventoryBot/1.0";

/// Settings applied when building the shared client.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// When false, TLS certificate verification is disabled
    /// (for environments behind TLS-inspecting proxies).
    pub verify_tls: bool,
}

/// Terminal fetch failure.
///
/// Covers permanent failures and retry-budget exhaustion alike; callers must
/// not depend on distinguishing the variants, only on the operation having
/// failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to initialize HTTP client: {reason}")]
    Client { reason: String },
    #[error("request for `{url}` failed: {reason}")]
    Request { url: String, reason: String },
    #[error("failed to fetch `{url}` after {attempts} attempts: {reason}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },
}

/// Outcome of one fetch attempt, before retry classification collapses it.
///
/// Transient failures (timeout, connection establishment) are internal
/// signals consumed by the retry layer and never escape it unwrapped.
#[derive(Debug)]
pub(crate) enum FetchAttemptError {
    Transient { reason: String },
    Fatal(FetchError),
}

/// Shared fetcher over a lazily created, reusable HTTP connection pool.
pub struct FetchClient {
    settings: HttpSettings,
    client: RwLock<Option<reqwest::Client>>,
}

impl FetchClient {
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            settings,
            client: RwLock::new(None),
        }
    }

    /// Return the shared client, building it on first use or after `close`.
    pub(crate) async fn handle(&self) -> Result<reqwest::Client, FetchError> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.client.write().await;
        // Another task may have built the client while we waited for the lock.
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let built = reqwest::Client::builder()
            .timeout(self.settings.timeout)
            .redirect(reqwest::redirect::Policy::default())
            .use_rustls_tls()
            .danger_accept_invalid_certs(!self.settings.verify_tls)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|err| FetchError::Client {
                reason: err.to_string(),
            })?;

        *guard = Some(built.clone());
        tracing::debug!("HTTP client created");
        Ok(built)
    }

    /// Close the shared client, releasing pooled connections.
    ///
    /// The next fetch recreates a fresh client.
    pub async fn close(&self) {
        let mut guard = self.client.write().await;
        if guard.take().is_some() {
            tracing::info!("HTTP client closed");
        }
    }

    /// Perform a single GET and map the response to an unsaved candidate
    /// record. `created_at` and `updated_at` are both stamped with the call
    /// time; the store adjusts them on write.
    pub(crate) async fn fetch(&self, url: &str) -> Result<MetadataRecord, FetchAttemptError> {
        if let Err(err) = Url::parse(url) {
            return Err(FetchAttemptError::Fatal(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: err.to_string(),
            }));
        }

        let client = self.handle().await.map_err(FetchAttemptError::Fatal)?;
        let now = Utc::now();

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| classify(url, err))?;

        let status_code = response.status().as_u16();

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.to_string(), value.to_string());
            }
        }

        let cookies: HashMap<String, String> = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();

        let page_source = response.text().await.map_err(|err| classify(url, err))?;

        Ok(MetadataRecord {
            url: url.to_string(),
            status_code,
            headers: Json(headers),
            cookies: Json(cookies),
            page_source,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Split a reqwest error into the transient classes the retry layer handles
/// (timeout, connection establishment) and everything else, which is
/// permanent.
fn classify(url: &str, err: reqwest::Error) -> FetchAttemptError {
    if err.is_timeout() || err.is_connect() {
        FetchAttemptError::Transient {
            reason: err.to_string(),
        }
    } else {
        FetchAttemptError::Fatal(FetchError::Request {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FetchClient {
        FetchClient::new(HttpSettings {
            timeout: Duration::from_secs(1),
            verify_tls: true,
        })
    }

    #[tokio::test]
    async fn malformed_url_is_fatal_without_touching_the_network() {
        let fetcher = client();
        match fetcher.fetch("not a url").await {
            Err(FetchAttemptError::Fatal(FetchError::InvalidUrl { url, .. })) => {
                assert_eq!(url, "not a url");
            }
            other => panic!("expected invalid-URL failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_then_reuse_rebuilds_the_client() {
        let fetcher = client();
        fetcher.handle().await.unwrap();
        fetcher.close().await;
        assert!(fetcher.client.read().await.is_none());
        fetcher.handle().await.unwrap();
        assert!(fetcher.client.read().await.is_some());
    }
}
