//! Storage backend abstraction and the replicated store built on top of it
//!
//! This module provides a unified interface over different storage backends
//! (local filesystem, S3) plus the replication layer that keeps a primary and
//! an optional backup disk consistent with best-effort semantics.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod factory;
pub mod local;
pub mod registry;
pub mod replicated;
#[cfg(feature = "s3")]
pub mod s3;
pub mod staging;
pub mod url;

pub use factory::build_registry;
pub use local::LocalStorageBackend;
pub use registry::{Disk, DiskRegistry};
pub use replicated::ReplicatedStore;
#[cfg(feature = "s3")]
pub use s3::S3StorageBackend;
pub use staging::{Staged, StagingArea};
pub use url::UrlResolver;

/// Well-known disk identifiers. Disks are configured once per process
/// lifetime; `backup` is optional and `staging` is always local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiskName {
    #[serde(rename = "primary")]
    Primary,
    #[serde(rename = "backup")]
    Backup,
    #[serde(rename = "staging")]
    Staging,
}

impl fmt::Display for DiskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskName::Primary => write!(f, "primary"),
            DiskName::Backup => write!(f, "backup"),
            DiskName::Staging => write!(f, "staging"),
        }
    }
}

impl FromStr for DiskName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "primary" => Ok(DiskName::Primary),
            "backup" => Ok(DiskName::Backup),
            "staging" => Ok(DiskName::Staging),
            other => Err(format!("unknown disk name: {}", other)),
        }
    }
}

/// Cross-cutting backup policy, consulted by reads and URL building instead of
/// being re-derived at each call site.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReplicationPolicy {
    /// Serve public URLs from the backup disk instead of the primary.
    pub serve_from_backup: bool,
}

/// Core storage backend trait all implementations provide. Paths are
/// slash-separated and backend-agnostic.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Initialize the backend (create directories, validate access).
    async fn initialize(&self) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;

    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Delete a single object. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Recursively remove a directory (prefix, for object stores).
    async fn delete_directory(&self, path: &str) -> Result<()>;

    /// All object paths under a prefix, relative to the backend root.
    async fn list_all(&self, prefix: &str) -> Result<Vec<String>>;

    /// True for backends without local filesystem access (object storage).
    fn is_remote(&self) -> bool;

    /// URL synthesized by the backend itself, if it can (public object URLs).
    fn native_url(&self, path: &str) -> Option<String>;

    /// Real filesystem root for local backends; `None` for remote ones.
    fn local_root(&self) -> Option<&Path>;

    /// Human-readable backend identifier.
    fn backend_type(&self) -> &'static str;
}
