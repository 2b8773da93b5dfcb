//! Outbound HTTP fetching.
//!
//! `client` owns the shared `reqwest` connection pool and performs single
//! GET attempts; `retry` wraps attempts with bounded exponential backoff for
//! transient failures.

pub mod client;
pub mod retry;

pub use client::{FetchClient, FetchError};
pub use retry::{RetryPolicy, fetch_with_retry};
