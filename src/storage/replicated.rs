//! Replicated store: one logical operation, every configured disk.
//!
//! Reads fall back from primary to backup so a degraded primary can keep
//! serving traffic; writes go to every disk so the replicas stay eventually
//! consistent. Replication is best-effort, not transactional: a failed write
//! on one disk is surfaced with per-disk detail but never rolled back on the
//! others. Disk loops are strictly sequential, so latency scales with the
//! number of configured disks.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{DiskFailure, FileKeeperError, Result};
use crate::storage::registry::{Disk, DiskRegistry};

#[derive(Clone)]
pub struct ReplicatedStore {
    registry: Arc<DiskRegistry>,
}

impl ReplicatedStore {
    pub fn new(registry: Arc<DiskRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DiskRegistry> {
        &self.registry
    }

    /// Name of the disk backend entities are recorded as stored on.
    pub fn storage_name(&self) -> String {
        self.registry.primary().backend().backend_type().to_string()
    }

    /// True if any configured disk has the object.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        for disk in self.registry.replicas() {
            if disk.backend().exists(path).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Content from the first disk that has the object, primary first.
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        for disk in self.registry.replicas() {
            if disk.backend().exists(path).await? {
                debug!(path, disk = %disk.name(), "serving read");
                return disk.backend().read(path).await;
            }
        }
        Err(FileKeeperError::NotFound {
            path: path.to_string(),
        })
    }

    /// Write to every configured disk. Failures are collected per disk and
    /// surfaced together; successful replicas keep their copy.
    pub async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut failures = Vec::new();
        let mut succeeded = 0usize;
        for disk in self.registry.replicas() {
            match disk.backend().write(path, data).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    error!(path, disk = %disk.name(), error = %e, "replica write failed");
                    failures.push(DiskFailure {
                        disk: disk.name(),
                        message: e.to_string(),
                    });
                }
            }
        }
        if failures.is_empty() {
            debug!(path, replicas = succeeded, bytes = data.len(), "stored object");
            Ok(())
        } else {
            Err(FileKeeperError::WriteFailure {
                failures,
                succeeded,
            })
        }
    }

    /// Delete from every disk that has the object; disks without it are
    /// silently skipped.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let mut failures = Vec::new();
        let mut succeeded = 0usize;
        for disk in self.registry.replicas() {
            if !disk.backend().exists(path).await? {
                continue;
            }
            match disk.backend().delete(path).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    error!(path, disk = %disk.name(), error = %e, "replica delete failed");
                    failures.push(DiskFailure {
                        disk: disk.name(),
                        message: e.to_string(),
                    });
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(FileKeeperError::WriteFailure {
                failures,
                succeeded,
            })
        }
    }

    /// Relocate `from` to `to` on every disk that has `from`. Fails when no
    /// disk had the source at all.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut moved = 0usize;
        let mut failures = Vec::new();
        for disk in self.registry.replicas() {
            if !disk.backend().exists(from).await? {
                continue;
            }
            match disk.backend().rename(from, to).await {
                Ok(()) => moved += 1,
                Err(e) => {
                    error!(from, to, disk = %disk.name(), error = %e, "replica rename failed");
                    failures.push(DiskFailure {
                        disk: disk.name(),
                        message: e.to_string(),
                    });
                }
            }
        }
        if !failures.is_empty() {
            return Err(FileKeeperError::WriteFailure {
                failures,
                succeeded: moved,
            });
        }
        if moved == 0 {
            return Err(FileKeeperError::Rename {
                from: from.to_string(),
            });
        }
        debug!(from, to, replicas = moved, "renamed object");
        Ok(())
    }

    /// Recursively remove a directory on every disk that has it.
    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        for disk in self.registry.replicas() {
            disk.backend().delete_directory(path).await?;
        }
        Ok(())
    }

    /// Remove a directory on each disk where it no longer holds any files.
    pub async fn delete_directory_if_empty(&self, path: &str) -> Result<()> {
        for disk in self.registry.replicas() {
            let remaining = disk.backend().list_all(path).await?;
            if remaining.is_empty() {
                disk.backend().delete_directory(path).await?;
            } else {
                debug!(
                    path,
                    disk = %disk.name(),
                    remaining = remaining.len(),
                    "directory still holds files, keeping it"
                );
            }
        }
        Ok(())
    }

    /// Real filesystem path of the object on the first local disk that has
    /// it, if any. Lets transforms skip staging entirely.
    pub async fn first_local_path(&self, path: &str) -> Result<Option<PathBuf>> {
        for disk in self.registry.replicas() {
            if let Some(root) = disk.backend().local_root() {
                if disk.backend().exists(path).await? {
                    return Ok(Some(root.join(path.trim_start_matches('/'))));
                }
            }
        }
        Ok(None)
    }

    /// Copy every file the primary has and the backup lacks onto the backup.
    pub async fn sync_primary_into_backup(&self) -> Result<()> {
        if let Some(backup) = self.registry.backup() {
            self.sync_disks(self.registry.primary(), backup).await?;
        }
        Ok(())
    }

    /// Copy every file the backup has and the primary lacks onto the primary.
    pub async fn sync_backup_into_primary(&self) -> Result<()> {
        if let Some(backup) = self.registry.backup() {
            self.sync_disks(backup, self.registry.primary()).await?;
        }
        Ok(())
    }

    async fn sync_disks(&self, from: &Disk, to: &Disk) -> Result<()> {
        let files = from.backend().list_all("").await?;
        let mut copied = 0usize;
        for path in files {
            if to.backend().exists(&path).await? {
                continue;
            }
            let contents = from.backend().read(&path).await?;
            if let Err(e) = to.backend().write(&path, &contents).await {
                warn!(path, from = %from.name(), to = %to.name(), error = %e, "sync copy failed");
                return Err(e);
            }
            copied += 1;
        }
        info!(from = %from.name(), to = %to.name(), copied, "synced disks");
        Ok(())
    }
}
