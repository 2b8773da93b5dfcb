//! Represents a stored HTTP metadata record, keyed by URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use std::collections::HashMap;

/// One metadata record per URL in the `metadata` table.
///
/// This is the internal, persisted shape. It carries the raw response body
/// (`page_source`), which is never returned through the API — see
/// `MetadataResponse` for the external projection.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct MetadataRecord {
    /// The fetched URL; unique key of the record.
    pub url: String,

    /// HTTP status code of the fetch attempt (any 1xx-5xx value is stored).
    pub status_code: u16,

    /// Response headers, name to value, duplicates collapsed (last wins).
    pub headers: Json<HashMap<String, String>>,

    /// Response cookies, name to value.
    pub cookies: Json<HashMap<String, String>>,

    /// Raw response body text. Stored, never projected outward.
    pub page_source: String,

    /// Set at the first successful fetch for this URL; immutable thereafter.
    pub created_at: DateTime<Utc>,

    /// Set by the store at every successful write.
    pub updated_at: DateTime<Utc>,
}
