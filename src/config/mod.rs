//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Supabase connection, absent when either value is missing
    pub store: Option<StoreConfig>,
    /// Per-request timeout for store calls
    pub store_timeout: Duration,

    /// Request body limit for form submissions (inline images included)
    pub max_upload_bytes: usize,
    /// Latency of the simulated image upload
    pub upload_delay: Duration,
}

/// Supabase endpoint and public key
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Supabase project URL
    pub url: String,
    /// Supabase anonymous key
    pub anon_key: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let url = var_with_alias("SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL");
        let anon_key = var_with_alias("SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY");
        let store = StoreConfig::from_parts(url, anon_key);

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            store,
            store_timeout: Duration::from_secs(parse_var("STORE_TIMEOUT_SECS", 10)?),

            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            upload_delay: Duration::from_millis(parse_var("UPLOAD_DELAY_MS", 1000)?),
        })
    }
}

impl StoreConfig {
    /// Both values must be present and non-blank, otherwise the store is unavailable
    pub fn from_parts(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let url = url.filter(|v| !v.trim().is_empty())?;
        let anon_key = anon_key.filter(|v| !v.trim().is_empty())?;
        Some(Self {
            url: url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
        })
    }
}

fn var_with_alias(name: &str, alias: &str) -> Option<String> {
    env::var(name).or_else(|_| env::var(alias)).ok()
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
