//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).
//!
//! Everything above this module addresses the store by key prefix. Prefixes
//! follow `object_store` path semantics: they match whole path segments, so
//! `document-storage/abc` never matches `document-storage/abc.bak/file`.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use mime::Mime;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use serde::{Deserialize, Serialize};

/// Errors raised by the storage wrapper.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of a stored document failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the service.")]
    BucketNotFound(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    ///
    /// Credentials and region that are not set here are read from the
    /// standard `AWS_*` environment variables.
    S3 {
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        #[serde(default)]
        region: Option<String>,
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key ID
        #[serde(default)]
        access_key: Option<String>,
        /// Secret access key
        #[serde(default)]
        secret_key: Option<String>,
        /// Allow plain HTTP; defaults to true for `http://` endpoints
        #[serde(default)]
        allow_http: Option<bool>,
    },
}

impl ObjectStoreConfig {
    /// Backend name without any location or credential details.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local { .. } => "local",
            Self::S3 { .. } => "s3",
        }
    }
}

/// Wrapper around different object storage backends.
#[derive(Debug, Clone)]
pub struct Storage {
    inner: Arc<dyn ObjectStore>,
    /// Whether the backend persists object attributes (content type).
    supports_attributes: bool,
}

impl Storage {
    /// Create a new storage backend from configuration.
    pub async fn new(config: &ObjectStoreConfig) -> Result<Self> {
        let storage = match config {
            ObjectStoreConfig::Memory => Self::memory(),

            ObjectStoreConfig::Local { path } => {
                // Ensure directory exists
                tokio::fs::create_dir_all(path).await?;
                let store = LocalFileSystem::new_with_prefix(path)
                    .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;
                Self {
                    inner: Arc::new(store),
                    // LocalFileSystem rejects puts that carry attributes
                    supports_attributes: false,
                }
            }

            ObjectStoreConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key,
                secret_key,
                allow_http,
            } => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"));
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(
                        allow_http.unwrap_or_else(|| endpoint.starts_with("http://")),
                    );
                } else if let Some(allow_http) = allow_http {
                    builder = builder.with_allow_http(*allow_http);
                }
                if let Some(access_key) = access_key {
                    builder = builder.with_access_key_id(access_key);
                }
                if let Some(secret_key) = secret_key {
                    builder = builder.with_secret_access_key(secret_key);
                }

                let store = builder
                    .build()
                    .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;
                let storage = Self::from_store(Arc::new(store));

                // Verify bucket exists by listing; fails fast if it doesn't
                match storage.ping().await {
                    Ok(()) => {}
                    Err(StorageError::ObjectStore(object_store::Error::NotFound { .. })) => {
                        return Err(StorageError::BucketNotFound(bucket.clone()));
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        if msg.contains("NoSuchBucket")
                            || msg.contains("bucket") && msg.contains("not")
                        {
                            return Err(StorageError::BucketNotFound(bucket.clone()));
                        }
                        return Err(e);
                    }
                }

                storage
            }
        };

        Ok(storage)
    }

    /// In-memory storage backend.
    pub fn memory() -> Self {
        Self::from_store(Arc::new(InMemory::new()))
    }

    /// Wrap an existing store. The store is assumed to persist attributes.
    pub fn from_store(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            supports_attributes: true,
        }
    }

    /// Check that the backend answers a listing request.
    pub async fn ping(&self) -> Result<()> {
        let root = Path::from("");
        self.inner.list(Some(&root)).try_next().await?;
        Ok(())
    }

    /// Whether at least one object lives under `prefix`.
    ///
    /// Only the first listing entry is pulled from the backend.
    pub async fn has_any(&self, prefix: &Path) -> Result<bool> {
        let first = self.inner.list(Some(prefix)).try_next().await?;
        Ok(first.is_some())
    }

    /// Every key under `prefix`. Pagination is drained before returning.
    pub async fn list_keys(&self, prefix: &Path) -> Result<Vec<Path>> {
        let keys = self
            .inner
            .list(Some(prefix))
            .map_ok(|meta| meta.location)
            .try_collect()
            .await?;
        Ok(keys)
    }

    pub async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy(from, to).await?;
        Ok(())
    }

    /// Delete the given keys in batches. Missing keys are not an error.
    pub async fn delete_keys(&self, keys: Vec<Path>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let locations = stream::iter(keys).map(Ok).boxed();
        let mut deleted = self.inner.delete_stream(locations);
        while let Some(result) = deleted.next().await {
            match result {
                Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Enumerate then delete everything under `prefix`. Returns the number of
    /// keys that were listed for deletion.
    pub async fn delete_prefix(&self, prefix: &Path) -> Result<usize> {
        let keys = self.list_keys(prefix).await?;
        let count = keys.len();
        self.delete_keys(keys).await?;
        Ok(count)
    }

    /// Put an object, tagging it with `content_type` where the backend
    /// supports attributes.
    pub async fn put(&self, path: &Path, data: Bytes, content_type: &Mime) -> Result<()> {
        let mut opts = PutOptions::default();
        if self.supports_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            opts.attributes = attributes;
        }
        self.inner
            .put_opts(path, PutPayload::from(data), opts)
            .await?;
        Ok(())
    }

    /// Get an object's bytes, or `None` when it does not exist.
    pub async fn get(&self, path: &Path) -> Result<Option<Bytes>> {
        Ok(self.get_with_content_type(path).await?.map(|(bytes, _)| bytes))
    }

    /// Get an object's bytes together with its stored content type.
    pub async fn get_with_content_type(
        &self,
        path: &Path,
    ) -> Result<Option<(Bytes, Option<String>)>> {
        match self.inner.get(path).await {
            Ok(result) => {
                let content_type = result
                    .attributes
                    .get(&Attribute::ContentType)
                    .map(|value| AsRef::<str>::as_ref(value).to_string());
                let bytes = result.bytes().await?;
                Ok(Some((bytes, content_type)))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
