use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Object storage for photos and exported workbooks.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `data` under `key` and returns its public URL.
    async fn put(&self, data: Bytes, key: &str) -> Result<String, ServiceError>;

    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Rejects keys that could escape the storage root.
pub fn sanitize_key(key: &str) -> Result<String, ServiceError> {
    let candidate = key.trim().replace('\\', "/");
    let path = Path::new(&candidate);
    let safe = !candidate.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if safe {
        Ok(candidate)
    } else {
        Err(ServiceError::ValidationError(format!(
            "invalid object key '{}'",
            key
        )))
    }
}

/// Stores objects as files under a root directory served at `public_url`.
#[derive(Clone, Debug)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn put(&self, data: Bytes, key: &str) -> Result<String, ServiceError> {
        let key = sanitize_key(key)?;
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))?;

        info!("Stored object {}", key);
        Ok(format!("{}/{}", self.public_url, key))
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let key = sanitize_key(key)?;
        match tokio::fs::remove_file(self.root.join(&key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {} already absent", key);
                Ok(())
            }
            Err(e) => Err(ServiceError::StorageUnavailable(e.to_string())),
        }
    }
}

/// Storage that is switched off; every call fails with `StorageUnavailable`.
#[derive(Clone, Debug, Default)]
pub struct DisabledObjectStorage;

#[async_trait]
impl ObjectStorage for DisabledObjectStorage {
    async fn put(&self, _data: Bytes, _key: &str) -> Result<String, ServiceError> {
        Err(ServiceError::StorageUnavailable(
            "object storage is not configured".into(),
        ))
    }

    async fn delete(&self, _key: &str) -> Result<(), ServiceError> {
        Err(ServiceError::StorageUnavailable(
            "object storage is not configured".into(),
        ))
    }
}

/// Picks the storage backend described by the configuration.
pub fn storage_from_config(config: &AppConfig) -> Arc<dyn ObjectStorage> {
    if config.storage_disabled {
        warn!("Object storage disabled; uploads and exports will fail");
        Arc::new(DisabledObjectStorage)
    } else {
        Arc::new(LocalObjectStorage::new(
            config.storage_root.clone(),
            config.storage_public_url.clone(),
        ))
    }
}
