//! Storage configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use filedock_shared::{RetrySettings, StorageBackend, StorageSettings};

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO
    S3 {
        /// S3 endpoint URL (provider default when absent).
        endpoint: Option<String>,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: Option<String>,
        /// AWS secret access key.
        secret_access_key: Option<String>,
        /// AWS region.
        region: String,
    },
    /// Google Cloud Storage
    Gcs {
        /// GCS bucket name.
        bucket: String,
        /// Service account credential file (ambient credentials when absent).
        credential_path: Option<String>,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory store (tests only)
    Memory,
}

impl StorageProvider {
    /// Create S3-compatible provider.
    #[must_use]
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self::S3 {
            endpoint: None,
            bucket: bucket.into(),
            access_key_id: None,
            secret_access_key: None,
            region: region.into(),
        }
    }

    /// Create Google Cloud Storage provider.
    #[must_use]
    pub fn gcs(bucket: impl Into<String>) -> Self {
        Self::Gcs {
            bucket: bucket.into(),
            credential_path: None,
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name for logging and metadata records.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::Gcs { .. } => "gcs",
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } | Self::Gcs { bucket, .. } => bucket,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
            Self::Memory => "memory",
        }
    }
}

/// Exponential backoff applied by the storage client on transient failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_factor: f32,
    /// Total time budget across all retries.
    pub max_retry_period: Duration,
}

impl RetryPolicy {
    /// Policy used for reads: 0.2s initial, doubling, capped at 5s, within 15s.
    pub const READ: Self = Self {
        initial_delay: Duration::from_millis(200),
        max_delay: Duration::from_secs(5),
        backoff_factor: 2.0,
        max_retry_period: Duration::from_secs(15),
    };

    /// Same window as [`Self::READ`] with a gentler 1.1 factor.
    pub const WRITE: Self = Self {
        backoff_factor: 1.1,
        ..Self::READ
    };

    /// Build a policy from configuration settings.
    #[must_use]
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_factor: settings.backoff_factor,
            max_retry_period: Duration::from_millis(settings.max_retry_period_ms),
        }
    }

    /// Replace the backoff factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f32) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Number of retries whose cumulative delay fits in `max_retry_period`.
    ///
    /// Always at least one, so a zero window still retries once.
    #[must_use]
    pub fn max_retries(&self) -> usize {
        let factor = f64::from(self.backoff_factor.max(1.0));
        let mut delay = self.initial_delay.min(self.max_delay);
        let mut elapsed = Duration::ZERO;
        let mut retries = 0usize;

        while !delay.is_zero() && elapsed + delay <= self.max_retry_period {
            elapsed += delay;
            retries += 1;
            delay = delay.mul_f64(factor).min(self.max_delay);
        }

        retries.max(1)
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Retry policy for stat, read, list and delete.
    pub read_retry: RetryPolicy,
    /// Retry policy for writes.
    pub write_retry: RetryPolicy,
    /// Minimum object age before the orphan sweep may delete it.
    pub orphan_grace: Duration,
}

impl StorageConfig {
    /// Default max file size: 32MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 32 * 1024 * 1024;

    /// Default orphan grace window: one hour.
    pub const DEFAULT_ORPHAN_GRACE: Duration = Duration::from_secs(3600);

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            read_retry: RetryPolicy::READ,
            write_retry: RetryPolicy::WRITE,
            orphan_grace: Self::DEFAULT_ORPHAN_GRACE,
        }
    }

    /// Build the storage config from loaded application settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected backend is missing a required setting.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let provider = match settings.backend {
            StorageBackend::S3 => StorageProvider::S3 {
                endpoint: settings.endpoint.clone(),
                bucket: settings.bucket.clone(),
                access_key_id: settings.access_key_id.clone(),
                secret_access_key: settings.secret_access_key.clone(),
                region: settings
                    .region
                    .clone()
                    .unwrap_or_else(|| "us-east-1".to_string()),
            },
            StorageBackend::Gcs => StorageProvider::Gcs {
                bucket: settings.bucket.clone(),
                credential_path: settings.credential_path.clone(),
            },
            StorageBackend::Fs => {
                let root = settings.root.as_deref().ok_or_else(|| {
                    StorageError::configuration("storage.root is required for the fs backend")
                })?;
                StorageProvider::local_fs(root)
            }
            StorageBackend::Memory => StorageProvider::Memory,
        };

        let read_retry = RetryPolicy::from_settings(&settings.retry);
        let write_retry = read_retry.with_backoff_factor(settings.write_backoff_factor);

        Ok(Self {
            provider,
            max_file_size: settings.max_file_size,
            read_retry,
            write_retry,
            orphan_grace: Duration::from_secs(settings.orphan_grace_secs),
        })
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the orphan grace window.
    #[must_use]
    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_provider_s3() {
        let provider = StorageProvider::s3("uploads", "us-west-2");
        assert_eq!(provider.name(), "s3");
        assert_eq!(provider.bucket(), "uploads");
    }

    #[test]
    fn test_storage_provider_gcs() {
        let provider = StorageProvider::gcs("deepspace9-1134.appspot.com");
        assert_eq!(provider.name(), "gcs");
        assert_eq!(provider.bucket(), "deepspace9-1134.appspot.com");
    }

    #[test]
    fn test_storage_provider_local() {
        let provider = StorageProvider::local_fs("./storage");
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_read_policy_retry_budget() {
        // 0.2 + 0.4 + 0.8 + 1.6 + 3.2 + 5 = 11.2s; one more 5s step would exceed 15s.
        assert_eq!(RetryPolicy::READ.max_retries(), 6);
    }

    #[test]
    fn test_write_policy_retries_more_often() {
        // 0.2 * (1.1^n - 1) / 0.1 <= 15 holds up to n = 22.
        assert_eq!(RetryPolicy::WRITE.max_retries(), 22);
    }

    #[test]
    fn test_zero_window_still_retries_once() {
        let policy = RetryPolicy {
            max_retry_period: Duration::ZERO,
            ..RetryPolicy::READ
        };
        assert_eq!(policy.max_retries(), 1);
    }

    #[test]
    fn test_from_settings_fs_requires_root() {
        let settings = StorageSettings {
            backend: StorageBackend::Fs,
            bucket: "b".to_string(),
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            credential_path: None,
            root: None,
            max_file_size: 1024,
            retry: RetrySettings::default(),
            write_backoff_factor: 1.1,
            orphan_grace_secs: 60,
        };

        let err = StorageConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn test_from_settings_uses_write_factor() {
        let settings = StorageSettings {
            backend: StorageBackend::Memory,
            bucket: "b".to_string(),
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            credential_path: None,
            root: None,
            max_file_size: 1024,
            retry: RetrySettings::default(),
            write_backoff_factor: 1.1,
            orphan_grace_secs: 60,
        };

        let config = StorageConfig::from_settings(&settings).expect("memory config");
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.read_retry, RetryPolicy::READ);
        assert_eq!(config.write_retry, RetryPolicy::WRITE);
        assert_eq!(config.provider.name(), "memory");
        assert_eq!(config.orphan_grace, Duration::from_secs(60));
    }
}
