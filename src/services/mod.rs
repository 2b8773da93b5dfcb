pub mod metadata_service;

pub use metadata_service::{MetadataError, MetadataService};
