//! Request and response shapes for the metadata API.

use crate::models::record::MetadataRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request body for `POST /metadata`.
#[derive(Debug, Deserialize)]
pub struct StoreMetadataRequest {
    pub url: String,
}

/// Generic acknowledgement body (successful store, 202 on cache miss).
#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub message: String,
}

/// External projection of a stored record.
///
/// `page_source` is intentionally absent: the body is persisted internally
/// but never exposed through the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub url: String,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MetadataRecord> for MetadataResponse {
    fn from(record: MetadataRecord) -> Self {
        Self {
            url: record.url,
            status_code: record.status_code,
            headers: record.headers.0,
            cookies: record.cookies.0,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn record() -> MetadataRecord {
        let now = Utc::now();
        MetadataRecord {
            url: "https://example.com/".into(),
            status_code: 200,
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

    #[test]
    fn projection_excludes_page_source() {
        let response = MetadataResponse::from(record());
        let value = serde_json::to_value(&response).unwrap();
        let obj = value.as_object().unwrap();

        assert!(obj.get("page_source").is_none());
        for field in [
            "url",
            "status_code",
            "headers",
            "cookies",
            "created_at",
            "updated_at",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
    }

    #[test]
    fn projection_preserves_values() {
        let response = MetadataResponse::from(record());
        assert_eq!(response.url, "https://example.com/");
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.headers.get("content-type").map(String::as_str),
            Some("text/html")
        );
    }
}
