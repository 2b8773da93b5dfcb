//! Persistence layer: one SQLite-backed collection of metadata records,
//! keyed uniquely by URL.

pub mod metadata_store;

pub use metadata_store::{MetadataStore, StoreError};
