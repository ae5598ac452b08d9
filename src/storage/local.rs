//! Local filesystem change store.
//!
//! The record is one line of text (`item:<id>` or `hash:<hex>`). Writes go to
//! a sibling temp file which is then renamed over the target, so a crash
//! mid-write leaves the previous record intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ChangeRecord;
use crate::storage::ChangeStore;

/// File-backed change store.
#[derive(Debug, Clone)]
pub struct FileChangeStore {
    path: PathBuf,
}

impl FileChangeStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read raw contents, returning None if the file doesn't exist.
    async fn read_raw(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ChangeStore for FileChangeStore {
    async fn read(&self) -> Option<ChangeRecord> {
        let raw = match self.read_raw().await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::debug!("No change record at {}", self.path.display());
                return None;
            }
            Err(e) => {
                log::warn!(
                    "Change record at {} is unreadable: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        if raw.trim().is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Ignoring change record at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    async fn write(&self, record: &ChangeRecord) -> Result<()> {
        self.write_bytes(record.to_string().as_bytes())
            .await
            .map_err(|e| AppError::persist(self.path.display().to_string(), e))
    }
}
