use crate::fetch::{client::HttpSettings, retry::RetryPolicy};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub http_timeout_secs: f64,
    pub http_max_retries: u32,
    pub http_verify_tls: bool,
    pub retry_min_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP metadata collection service")]
pub struct Args {
    /// Host to bind to (overrides METADATA_INVENTORY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides METADATA_INVENTORY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides METADATA_INVENTORY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Per-attempt fetch timeout in seconds (overrides METADATA_INVENTORY_HTTP_TIMEOUT)
    #[arg(long)]
    pub http_timeout: Option<f64>,

    /// Maximum retries for transient fetch failures (overrides METADATA_INVENTORY_HTTP_MAX_RETRIES)
    #[arg(long)]
    pub http_max_retries: Option<u32>,

    /// Skip TLS certificate verification on outbound fetches
    #[arg(long)]
    pub no_verify_tls: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("METADATA_INVENTORY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("METADATA_INVENTORY_PORT", 3000u16)?;
        let env_db = env::var("METADATA_INVENTORY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/metadata_inventory.db".into());
        let env_timeout = parse_env("METADATA_INVENTORY_HTTP_TIMEOUT", 10.0f64)?;
        let env_max_retries = parse_env("METADATA_INVENTORY_HTTP_MAX_RETRIES", 3u32)?;
        let env_verify_tls = parse_env("METADATA_INVENTORY_HTTP_VERIFY_TLS", true)?;
        let env_min_backoff = parse_env("METADATA_INVENTORY_RETRY_MIN_BACKOFF_MS", 500u64)?;
        let env_max_backoff = parse_env("METADATA_INVENTORY_RETRY_MAX_BACKOFF_MS", 10_000u64)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            http_timeout_secs: args.http_timeout.unwrap_or(env_timeout),
            http_max_retries: args.http_max_retries.unwrap_or(env_max_retries),
            http_verify_tls: if args.no_verify_tls {
                false
            } else {
                env_verify_tls
            },
            retry_min_backoff_ms: env_min_backoff,
            retry_max_backoff_ms: env_max_backoff,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings consumed by the outbound HTTP client.
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs_f64(self.http_timeout_secs),
            verify_tls: self.http_verify_tls,
        }
    }

    /// Retry policy for one outer fetch call.
    ///
    /// Built fresh from the live config at every call site so a changed
    /// retry budget takes effect on the next call without restart.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.http_max_retries,
            min_backoff: Duration::from_millis(self.retry_min_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }
}

/// Read an env var and parse it, falling back to `default` when unset.
fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
