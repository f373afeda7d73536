//! Storage service implementation using Apache OpenDAL.

use std::collections::HashMap;
use std::io;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use opendal::layers::RetryLayer;
use opendal::{ErrorKind, Operator, services};
use tracing::debug;

use super::config::{RetryPolicy, StorageConfig, StorageProvider};
use super::error::StorageError;

/// Byte stream of a stored object's content.
pub type ObjectStream = BoxStream<'static, io::Result<Bytes>>;

/// Result of a `stat` call on an existing object.
#[derive(Debug, Clone)]
pub struct ObjectStat {
    /// Storage key.
    pub key: String,
    /// Content length in bytes.
    pub content_length: u64,
    /// Content type, if the backend keeps one.
    pub content_type: Option<String>,
    /// User metadata, if the backend keeps any.
    pub metadata: HashMap<String, String>,
    /// Last modification time, if the backend reports one.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Options attached to an object write.
#[derive(Debug, Clone, Default)]
pub struct ObjectWrite {
    /// Content type (MIME type).
    pub content_type: Option<String>,
    /// User metadata stored alongside the object.
    pub metadata: HashMap<String, String>,
}

impl ObjectWrite {
    /// Create write options with a content type.
    #[must_use]
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            metadata: HashMap::new(),
        }
    }

    /// Add a user metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Storage service for uploaded files.
///
/// Holds two handles on the same backend so reads and writes can carry
/// different retry policies.
pub struct StorageService {
    reader: Operator,
    writer: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        let reader = operator.clone().layer(retry_layer(&config.read_retry));
        let writer = operator.layer(retry_layer(&config.write_retry));

        Ok(Self {
            reader,
            writer,
            config,
        })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let mut builder = services::S3::default().bucket(bucket).region(region);
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                if let Some(key) = access_key_id {
                    builder = builder.access_key_id(key);
                }
                if let Some(secret) = secret_access_key {
                    builder = builder.secret_access_key(secret);
                }
                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::Gcs {
                bucket,
                credential_path,
            } => {
                let mut builder = services::Gcs::default().bucket(bucket);
                if let Some(path) = credential_path {
                    builder = builder.credential_path(path);
                }
                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );
                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish(),
        };

        Ok(operator)
    }

    /// Reject payloads above the configured size limit.
    ///
    /// # Errors
    ///
    /// Returns `FileTooLarge` if `size` exceeds the limit.
    pub fn validate_size(&self, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }
        Ok(())
    }

    /// Build a storage key from a folder and a file name.
    ///
    /// Format: `{folder segments}/{file name}`. Names are kept verbatim, so
    /// distinct names always map to distinct keys.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if a component is blank, a relative path segment,
    /// or contains a control character.
    pub fn storage_key(folder: &str, file_name: &str) -> Result<String, StorageError> {
        let mut segments = Vec::new();
        for raw in folder.split('/').filter(|s| !s.is_empty()) {
            segments.push(checked_segment(raw)?);
        }
        if segments.is_empty() {
            return Err(StorageError::invalid_key("folder must not be empty"));
        }

        segments.push(checked_segment(base_name(file_name))?);

        Ok(segments.join("/"))
    }

    /// Look up an object. `Ok(None)` means the object does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails for any other reason.
    pub async fn stat(&self, key: &str) -> Result<Option<ObjectStat>, StorageError> {
        match self.reader.stat(key).await {
            Ok(meta) => Ok(Some(ObjectStat {
                key: key.to_string(),
                content_length: meta.content_length(),
                content_type: meta.content_type().map(String::from),
                metadata: meta.user_metadata().cloned().unwrap_or_default(),
                last_modified: meta
                    .last_modified()
                    .map(|ts| DateTime::<Utc>::from(SystemTime::from(ts))),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_opendal(key, &e)),
        }
    }

    /// Open an object for streaming.
    ///
    /// Backends may only report a missing object once the stream is polled,
    /// so callers that need a clean 404 should `stat` first.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader cannot be created.
    pub async fn open(&self, key: &str) -> Result<ObjectStream, StorageError> {
        let reader = self
            .reader
            .reader(key)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        let stream = reader
            .into_bytes_stream(..)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;

        Ok(stream.boxed())
    }

    /// Read a whole object into memory.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the object does not exist.
    pub async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self
            .reader
            .read(key)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        Ok(buffer.to_bytes())
    }

    /// Write an object, replacing any previous content under `key`.
    ///
    /// Content type and user metadata are attached only when the backend
    /// supports them; callers must not rely on reading them back.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is too large or the write fails.
    pub async fn write(
        &self,
        key: &str,
        data: Bytes,
        options: ObjectWrite,
    ) -> Result<(), StorageError> {
        self.validate_size(data.len() as u64)?;

        let capability = self.writer.info().full_capability();
        let mut write = self.writer.write_with(key, data);
        if capability.write_with_content_type {
            if let Some(content_type) = options.content_type.as_deref() {
                write = write.content_type(content_type);
            }
        }
        if capability.write_with_user_metadata && !options.metadata.is_empty() {
            write = write.user_metadata(options.metadata);
        }

        write
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        debug!(key = %key, "Object written");
        Ok(())
    }

    /// Delete an object. Deleting a missing object succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.reader
            .delete(key)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))
    }

    /// List object keys below `prefix`, recursively. Directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let path = if prefix.is_empty() { "/" } else { prefix };
        let entries = self
            .reader
            .list_with(path)
            .recursive(true)
            .await
            .map_err(|e| StorageError::from_opendal(path, &e))?;

        Ok(entries
            .into_iter()
            .map(|entry| entry.path().to_string())
            .filter(|p| !p.ends_with('/'))
            .collect())
    }

    /// Check if an object exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        matches!(self.stat(key).await, Ok(Some(_)))
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.config.provider.bucket()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

fn retry_layer(policy: &RetryPolicy) -> RetryLayer {
    RetryLayer::new()
        .with_min_delay(policy.initial_delay)
        .with_max_delay(policy.max_delay)
        .with_factor(policy.backoff_factor)
        .with_max_times(policy.max_retries())
}

fn checked_segment(raw: &str) -> Result<String, StorageError> {
    if raw.trim().is_empty() || raw == "." || raw == ".." {
        return Err(StorageError::invalid_key(format!(
            "invalid key component '{raw}'"
        )));
    }
    if raw.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(StorageError::invalid_key(format!(
            "key component '{}' contains a separator or control character",
            raw.escape_debug()
        )));
    }
    Ok(raw.to_string())
}

/// Last path segment of a client-supplied file name.
///
/// Browsers on some platforms send the full local path.
#[must_use]
pub fn base_name(file_name: &str) -> &str {
    file_name.rsplit(['/', '\\']).next().unwrap_or(file_name)
}
