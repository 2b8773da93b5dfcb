//! Defines routes for the metadata collection service.
//!
//! ## Structure
//! - **Metadata endpoints**
//!   - `POST /metadata` — fetch live metadata for a URL and store it
//!   - `GET  /metadata?url=` — return the cached record; on a miss, trigger
//!     background collection and respond 202
//!
//! - **Probes**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz`  — readiness (DB connectivity)

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        metadata_handlers::{get_metadata, store_metadata},
    },
    services::MetadataService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all service routes.
///
/// The router carries shared state (`MetadataService`) to all handlers.
pub fn routes() -> Router<MetadataService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // metadata endpoints
        .route("/metadata", post(store_metadata).get(get_metadata))
}
