//! Data models for the metadata inventory service.
//!
//! `record` holds the persisted entity (mapped to the database via
//! `sqlx::FromRow`); `api` holds the JSON shapes exchanged over HTTP,
//! including the external projection that omits the stored body.

pub mod api;
pub mod record;
