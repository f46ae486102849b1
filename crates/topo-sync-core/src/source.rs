//! Object storage seam
//!
//! The export is read from the root of an object store. Archived exports live
//! under `archive/` and are ignored; anything else at the root must be exactly
//! one object.

use crate::error::{SourceError, SyncError, SyncResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Prefix of archived exports
pub const ARCHIVE_PREFIX: &str = "archive/";

/// Read access to an object store
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Keys starting with `prefix`
    ///
    /// Order is backend-defined.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SourceError>;

    /// Object contents
    async fn get(&self, key: &str) -> Result<Vec<u8>, SourceError>;
}

/// Pick the single export at the storage root
pub fn select_root_object(keys: Vec<String>) -> SyncResult<String> {
    let mut candidates: Vec<String> = keys
        .into_iter()
        .filter(|key| !key.starts_with(ARCHIVE_PREFIX))
        .collect();
    if candidates.len() != 1 {
        return Err(SyncError::SourceFileCount {
            found: candidates.len(),
        });
    }
    Ok(candidates.remove(0))
}

/// Object store backed by a local directory
///
/// Keys are `/`-separated paths relative to the root directory.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    /// Create source over `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectSource for LocalDirSource {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SourceError> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| SourceError::io_error(&dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SourceError::io_error(&dir, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| SourceError::io_error(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SourceError> {
        let path = key
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(key.to_string()))
            }
            Err(e) => Err(SourceError::io_error(path, e)),
        }
    }
}
