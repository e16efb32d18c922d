//! Factory for creating storage backends based on configuration

use std::sync::Arc;

use tracing::warn;

use crate::config::{Config, DiskConfig, DiskDriver};
use crate::error::{FileKeeperError, Result};
use crate::storage::local::LocalStorageBackend;
use crate::storage::registry::{Disk, DiskRegistry};
use crate::storage::{DiskName, ReplicationPolicy, StorageBackend};

/// Build the disk registry from configuration. Fails with a configuration
/// error when the primary disk is absent; a backup pointing at the same
/// target as the primary is dropped rather than replicated into itself.
pub async fn build_registry(config: &Config) -> Result<Arc<DiskRegistry>> {
    let storage = &config.storage;

    let primary_config = storage.primary.as_ref().ok_or_else(|| {
        FileKeeperError::Configuration("primary disk configuration is missing".to_string())
    })?;
    let primary = build_disk(DiskName::Primary, primary_config).await?;

    let backup = match &storage.backup {
        Some(backup_config) if same_target(&primary_config.driver, &backup_config.driver) => {
            warn!("backup disk targets the same storage as the primary; ignoring it");
            None
        }
        Some(backup_config) => Some(build_disk(DiskName::Backup, backup_config).await?),
        None => None,
    };

    let staging = Arc::new(LocalStorageBackend::new(&storage.staging_root));
    staging.initialize().await?;

    let policy = ReplicationPolicy {
        serve_from_backup: storage.serve_from_backup,
    };

    Ok(Arc::new(DiskRegistry::new(primary, backup, staging, policy)))
}

async fn build_disk(name: DiskName, config: &DiskConfig) -> Result<Disk> {
    let backend: Arc<dyn StorageBackend> = match &config.driver {
        DiskDriver::Local { root } => {
            let backend = LocalStorageBackend::new(root);
            backend.initialize().await?;
            Arc::new(backend)
        }
        #[cfg(feature = "s3")]
        DiskDriver::S3(s3_config) => {
            let backend = crate::storage::s3::S3StorageBackend::new(s3_config.clone()).await?;
            backend.initialize().await?;
            Arc::new(backend)
        }
    };
    Ok(Disk::new(name, backend, config.public_url.clone()))
}

fn same_target(a: &DiskDriver, b: &DiskDriver) -> bool {
    match (a, b) {
        (DiskDriver::Local { root: a }, DiskDriver::Local { root: b }) => a == b,
        #[cfg(feature = "s3")]
        (DiskDriver::S3(a), DiskDriver::S3(b)) => {
            a.bucket_name == b.bucket_name
                && a.prefix == b.prefix
                && a.endpoint_url == b.endpoint_url
        }
        #[cfg(feature = "s3")]
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_primary_is_a_configuration_error() {
        let config = Config::default();
        let err = build_registry(&config).await.unwrap_err();
        assert!(matches!(err, FileKeeperError::Configuration(_)));
    }

    #[tokio::test]
    async fn backup_matching_primary_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("disk").to_string_lossy().into_owned();

        let mut config = Config::default();
        config.storage.staging_root = dir.path().join("staging").to_string_lossy().into_owned();
        config.storage.primary = Some(DiskConfig {
            driver: DiskDriver::Local { root: root.clone() },
            public_url: None,
        });
        config.storage.backup = Some(DiskConfig {
            driver: DiskDriver::Local { root },
            public_url: None,
        });

        let registry = build_registry(&config).await.unwrap();
        assert!(!registry.has_backup());
    }
}
