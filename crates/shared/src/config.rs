//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Object storage configuration.
    pub storage: StorageSettings,
    /// CORS configuration for the upload endpoints.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Pre-signed upload URL configuration.
    #[serde(default)]
    pub signing: SigningConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// S3-compatible object storage.
    S3,
    /// Google Cloud Storage.
    Gcs,
    /// Local filesystem.
    Fs,
    /// In-process memory (tests and throwaway dev instances).
    Memory,
}

/// Object storage settings as loaded from configuration sources.
///
/// Translated into the core storage configuration at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Which backend to use.
    pub backend: StorageBackend,
    /// Bucket (S3/GCS) that uploads land in.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Custom endpoint (S3-compatible providers).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region (S3).
    #[serde(default)]
    pub region: Option<String>,
    /// Access key id (S3).
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key (S3).
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Service account credential file (GCS).
    #[serde(default)]
    pub credential_path: Option<String>,
    /// Root directory (filesystem backend).
    #[serde(default)]
    pub root: Option<String>,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Retry policy for reads and metadata lookups.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Backoff factor used for writes instead of `retry.backoff_factor`.
    #[serde(default = "default_write_backoff_factor")]
    pub write_backoff_factor: f32,
    /// Objects younger than this are left alone by the orphan sweep.
    #[serde(default = "default_orphan_grace_secs")]
    pub orphan_grace_secs: u64,
}

fn default_bucket() -> String {
    "deepspace9-1134.appspot.com".to_string()
}

fn default_max_file_size() -> u64 {
    32 * 1024 * 1024
}

fn default_write_backoff_factor() -> f32 {
    1.1
}

fn default_orphan_grace_secs() -> u64 {
    3600
}

/// Exponential backoff settings handed to the storage client.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for a single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplicative factor between consecutive delays.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f32,
    /// Total time budget for retries, in milliseconds.
    #[serde(default = "default_max_retry_period_ms")]
    pub max_retry_period_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_retry_period_ms: default_max_retry_period_ms(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_backoff_factor() -> f32 {
    2.0
}

fn default_max_retry_period_ms() -> u64 {
    15_000
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Origins whose `Origin` header is echoed back in `Access-Control-Allow-Origin`.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:9000".to_string()]
}

/// Pre-signed upload URL configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    /// Bucket on the external object store.
    #[serde(default = "default_signing_bucket")]
    pub bucket: String,
    /// Regional host the bucket is addressed under.
    #[serde(default = "default_signing_host")]
    pub host: String,
    /// Access key id embedded in signed URLs.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret key used for HMAC signing.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Validity window of issued URLs, in seconds.
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            bucket: default_signing_bucket(),
            host: default_signing_host(),
            access_key_id: None,
            secret_key: None,
            expiry_secs: default_expiry_secs(),
        }
    }
}

fn default_signing_bucket() -> String {
    "deepspace9".to_string()
}

fn default_signing_host() -> String {
    "s3-us-west-2.amazonaws.com".to_string()
}

fn default_expiry_secs() -> u64 {
    86_400 // 24 hours
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FILEDOCK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
