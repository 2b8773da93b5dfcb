//! HTTP handlers for the metadata endpoints.
//!
//! Validates and normalizes URLs at the boundary, maps service failures to
//! client/server statuses, and schedules background collection on read-path
//! cache misses.

use crate::{
    errors::AppError,
    models::api::{AcceptedResponse, MetadataResponse, StoreMetadataRequest},
    services::{MetadataError, MetadataService},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, warn};
use url::Url;

/// Query params for `GET /metadata`.
#[derive(Debug, Deserialize)]
pub struct GetMetadataQuery {
    pub url: String,
}

/// `POST /metadata` — fetch live metadata for the given URL and persist it.
/// Blocks until the fetch and upsert complete.
///
/// - **200** — metadata fetched and stored successfully
/// - **400** — URL could not be fetched (network / DNS error)
/// - **422** — invalid URL format
/// - **500** — database failure
pub async fn store_metadata(
    State(service): State<MetadataService>,
    Json(request): Json<StoreMetadataRequest>,
) -> Result<Json<AcceptedResponse>, AppError> {
    let url = normalize_url(&request.url)?;

    match service.store_metadata(&url).await {
        Ok(_) => Ok(Json(AcceptedResponse {
            message: format!("Metadata stored for {url}"),
        })),
        Err(err @ MetadataError::Fetch(_)) => {
            warn!(url = %url, error = %err, "POST /metadata fetch error");
            Err(err.into())
        }
        Err(err @ MetadataError::Store(_)) => {
            error!(url = %url, error = %err, "POST /metadata store error");
            Err(err.into())
        }
    }
}

/// `GET /metadata?url=...` — return the cached record for a URL.
///
/// On a cache miss, responds **202 Accepted** immediately and spawns a
/// detached background task to fetch and store the metadata; the task has no
/// channel back to this response and swallows its own failures.
///
/// - **200** — record found and returned (without the stored body)
/// - **202** — not yet stored; background collection has been triggered
/// - **422** — `url` missing or not a valid HTTP URL
/// - **500** — database failure
pub async fn get_metadata(
    State(service): State<MetadataService>,
    Query(query): Query<GetMetadataQuery>,
) -> Result<Response, AppError> {
    let url = normalize_url(&query.url)?;

    match service.get_metadata(&url).await {
        Ok(Some(record)) => Ok(Json(MetadataResponse::from(record)).into_response()),
        Ok(None) => {
            let background = service.clone();
            let collect_url = url.clone();
            tokio::spawn(async move { background.background_collect(collect_url).await });

            let body = AcceptedResponse {
                message: format!("No metadata yet for {url}. Collection triggered."),
            };
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
        Err(err) => {
            error!(url = %url, error = %err, "GET /metadata store error");
            Err(AppError::internal(err.to_string()))
        }
    }
}

/// Validate that `raw` is an absolute http(s) URL and return its normalized
/// form (the same canonicalization the fetch layer will apply).
fn normalize_url(raw: &str) -> Result<String, AppError> {
    let parsed =
        Url::parse(raw).map_err(|_| AppError::unprocessable(format!("Invalid URL: {raw}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::unprocessable(format!("Invalid URL: {raw}")));
    }
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_normalizes_http_urls() {
        assert_eq!(
            normalize_url("https://example.com").unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url("http://example.com/a?b=1").unwrap(),
            "http://example.com/a?b=1"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = normalize_url("ftp://example.com/").unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn rejects_relative_and_garbage_input() {
        assert!(normalize_url("example.com").is_err());
        assert!(normalize_url("::not-a-url::").is_err());
        assert!(normalize_url("").is_err());
    }
}
