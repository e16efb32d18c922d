//! Disk registry: explicitly constructed, injected into every component.
//!
//! No process-wide statics; the registry is built once at application
//! bootstrap and shared behind an `Arc`. Configuration does not change at
//! runtime.

use std::sync::Arc;

use crate::error::{FileKeeperError, Result};
use crate::storage::local::LocalStorageBackend;
use crate::storage::{DiskName, ReplicationPolicy, StorageBackend};

/// A resolved backend handle plus its URL configuration.
#[derive(Clone)]
pub struct Disk {
    name: DiskName,
    backend: Arc<dyn StorageBackend>,
    public_base_url: Option<String>,
}

impl Disk {
    pub fn new(
        name: DiskName,
        backend: Arc<dyn StorageBackend>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            name,
            backend,
            public_base_url,
        }
    }

    pub fn name(&self) -> DiskName {
        self.name
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url.as_deref()
    }

    pub fn is_remote(&self) -> bool {
        self.backend.is_remote()
    }
}

impl std::fmt::Debug for Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disk")
            .field("name", &self.name)
            .field("backend", &self.backend.backend_type())
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

/// Primary disk, optional backup, and the always-local staging disk.
pub struct DiskRegistry {
    primary: Disk,
    backup: Option<Disk>,
    staging: Arc<LocalStorageBackend>,
    policy: ReplicationPolicy,
}

impl DiskRegistry {
    pub fn new(
        primary: Disk,
        backup: Option<Disk>,
        staging: Arc<LocalStorageBackend>,
        policy: ReplicationPolicy,
    ) -> Self {
        Self {
            primary,
            backup,
            staging,
            policy,
        }
    }

    /// Resolve a disk handle by name.
    pub fn disk(&self, name: DiskName) -> Result<&Disk> {
        match name {
            DiskName::Primary => Ok(&self.primary),
            DiskName::Backup => self.backup.as_ref().ok_or_else(|| {
                FileKeeperError::Configuration("backup disk is not configured".to_string())
            }),
            DiskName::Staging => Err(FileKeeperError::Configuration(
                "staging disk is accessed through the staging area".to_string(),
            )),
        }
    }

    pub fn primary(&self) -> &Disk {
        &self.primary
    }

    pub fn backup(&self) -> Option<&Disk> {
        self.backup.as_ref()
    }

    pub fn has_backup(&self) -> bool {
        self.backup.is_some()
    }

    pub fn is_remote(&self, name: DiskName) -> Result<bool> {
        Ok(self.disk(name)?.is_remote())
    }

    /// Replicated disks in read-fallback order: primary first, then backup.
    pub fn replicas(&self) -> impl Iterator<Item = &Disk> {
        std::iter::once(&self.primary).chain(self.backup.as_ref())
    }

    pub fn staging(&self) -> &Arc<LocalStorageBackend> {
        &self.staging
    }

    pub fn policy(&self) -> ReplicationPolicy {
        self.policy
    }

    /// The disk public URLs should point at, per the replication policy.
    pub fn serving_disk(&self) -> &Disk {
        if self.policy.serve_from_backup {
            if let Some(backup) = &self.backup {
                return backup;
            }
        }
        &self.primary
    }
}

impl std::fmt::Debug for DiskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskRegistry")
            .field("primary", &self.primary)
            .field("backup", &self.backup)
            .field("policy", &self.policy)
            .finish()
    }
}
