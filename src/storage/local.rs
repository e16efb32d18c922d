//! Local filesystem storage backend implementation

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::StorageBackend;
use crate::error::{FileKeeperError, Result};

/// Local filesystem storage backend rooted at a single directory. Stored
/// paths are resolved relative to the root; writes create parent directories
/// on demand.
#[derive(Debug, Clone)]
pub struct LocalStorageBackend {
    root: PathBuf,
}

impl LocalStorageBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem path for a stored path.
    pub fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageBackend for LocalStorageBackend {
    async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            FileKeeperError::Configuration(format!(
                "failed to create storage root {}: {}",
                self.root.display(),
                e
            ))
        })?;
        info!(root = %self.root.display(), "initialized local storage backend");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(path)).await?)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.full_path(path);
        match fs::read(&full).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileKeeperError::NotFound {
                    path: path.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, data).await?;
        debug!(path = %full.display(), bytes = data.len(), "wrote file");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.full_path(path);
        match fs::remove_file(&full).await {
            Ok(()) => {
                debug!(path = %full.display(), "deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let to_full = self.full_path(to);
        if let Some(parent) = to_full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(self.full_path(from), &to_full).await?;
        debug!(from, to, "renamed file");
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> Result<()> {
        let full = self.full_path(path);
        match fs::remove_dir_all(&full).await {
            Ok(()) => {
                debug!(path = %full.display(), "deleted directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        let base = self.full_path(prefix);
        if !fs::try_exists(&base).await? {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(&base).follow_links(false) {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("failed to walk {}: {}", base.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                paths.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn is_remote(&self) -> bool {
        false
    }

    fn native_url(&self, _path: &str) -> Option<String> {
        None
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
