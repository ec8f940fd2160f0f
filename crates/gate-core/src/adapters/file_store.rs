//! File-backed auth state store
//!
//! The whole store is one JSON object. Writes go to a sibling temp file
//! that is then renamed over the original, so a crash never leaves a
//! half-written document behind. A missing file reads as an empty store.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::StoreMap;
use crate::error::StoreError;
use crate::ports::{AuthStateStore, StoreResult};

#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    io: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<StoreMap> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreMap::new()),
            Err(e) => return Err(StoreError::Unavailable(e.to_string())),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreMap::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    async fn persist(&self, values: &StoreMap) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let body =
            serde_json::to_vec_pretty(values).map_err(|e| StoreError::Backend(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        debug!(path = %self.path.display(), keys = values.len(), "State persisted");
        Ok(())
    }
}

#[async_trait]
impl AuthStateStore for FileStateStore {
    async fn get(&self, keys: &[&str]) -> StoreResult<StoreMap> {
        let _guard = self.io.lock().await;
        let mut values = self.load().await?;
        values.retain(|key, _| keys.contains(&key.as_str()));
        Ok(values)
    }

    async fn set(&self, values: StoreMap) -> StoreResult<()> {
        let _guard = self.io.lock().await;
        let mut current = self.load().await?;
        current.extend(values);
        self.persist(&current).await
    }
}
