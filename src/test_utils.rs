/*!
 * Test helpers and doubles
 *
 * Shared utilities for building registries over temporary directories plus
 * controllable backend and transcoder doubles. Tests can modify the returned
 * objects as needed.
 */

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{Config, DiskConfig, DiskDriver};
use crate::error::{FileKeeperError, Result};
use crate::hash_index::MemoryHashIndex;
use crate::pipeline::FileKeeper;
use crate::storage::{
    build_registry, DiskRegistry, ReplicationPolicy, StorageBackend,
};
use crate::transform::VideoTranscoder;

/// Configuration with local primary (and optional backup) disks under `base`.
pub fn config_with_local_disks(base: &Path, with_backup: bool) -> Config {
    let mut config = Config::default();
    config.storage.primary = Some(DiskConfig {
        driver: DiskDriver::Local {
            root: base.join("primary").to_string_lossy().into_owned(),
        },
        public_url: None,
    });
    if with_backup {
        config.storage.backup = Some(DiskConfig {
            driver: DiskDriver::Local {
                root: base.join("backup").to_string_lossy().into_owned(),
            },
            public_url: None,
        });
    }
    config.storage.staging_root = base.join("staging").to_string_lossy().into_owned();
    config
}

/// Registry over temporary local disks.
pub async fn local_registry(base: &Path, with_backup: bool) -> Arc<DiskRegistry> {
    let config = config_with_local_disks(base, with_backup);
    build_registry(&config)
        .await
        .expect("failed to build test registry")
}

/// A fully wired FileKeeper over temporary local disks with an in-memory
/// hash index and a succeeding mock transcoder.
pub async fn file_keeper(base: &Path, with_backup: bool) -> FileKeeper {
    file_keeper_with_transcoder(base, with_backup, Arc::new(MockTranscoder::succeeding())).await
}

pub async fn file_keeper_with_transcoder(
    base: &Path,
    with_backup: bool,
    transcoder: Arc<dyn VideoTranscoder>,
) -> FileKeeper {
    let config = config_with_local_disks(base, with_backup);
    let registry = build_registry(&config)
        .await
        .expect("failed to build test registry");
    FileKeeper::new(config, registry, Arc::new(MemoryHashIndex::new()), transcoder)
}

/// Encoded PNG with deterministic pixel content.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::ImageBuffer::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("failed to encode sample png");
    out.into_inner()
}

/// In-memory storage backend with failure and capability toggles. Doubles as
/// a "remote" disk for staging tests and as a write-failing replica.
pub struct MemoryBackend {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    remote: bool,
    native_url_base: Option<String>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            remote: false,
            native_url_base: None,
        }
    }

    /// Report as a remote disk (no local root), like object storage.
    pub fn remote() -> Self {
        Self {
            remote: true,
            ..Self::new()
        }
    }

    pub fn with_native_url(mut self, base: impl Into<String>) -> Self {
        self.native_url_base = Some(base.into());
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| FileKeeperError::NotFound {
                path: path.to_string(),
            })
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FileKeeperError::Backend(
                "simulated write failure".to_string(),
            ));
        }
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        match files.remove(from) {
            Some(data) => {
                files.insert(to.to_string(), data);
                Ok(())
            }
            None => Err(FileKeeperError::NotFound {
                path: from.to_string(),
            }),
        }
    }

    async fn delete_directory(&self, path: &str) -> Result<()> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<String> = if prefix.is_empty() {
            files.keys().cloned().collect()
        } else {
            let dir_prefix = format!("{}/", prefix.trim_end_matches('/'));
            files
                .keys()
                .filter(|key| key.starts_with(&dir_prefix))
                .cloned()
                .collect()
        };
        paths.sort();
        Ok(paths)
    }

    fn is_remote(&self) -> bool {
        self.remote
    }

    fn native_url(&self, path: &str) -> Option<String> {
        self.native_url_base
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), path))
    }

    fn local_root(&self) -> Option<&Path> {
        None
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// Backend that claims every path exists; drives the uniqueness search into
/// its retry ceiling.
pub struct SaturatedBackend;

#[async_trait]
impl StorageBackend for SaturatedBackend {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _path: &str) -> Result<bool> {
        Ok(true)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Err(FileKeeperError::NotFound {
            path: path.to_string(),
        })
    }

    async fn write(&self, _path: &str, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    async fn rename(&self, _from: &str, _to: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_directory(&self, _path: &str) -> Result<()> {
        Ok(())
    }

    async fn list_all(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn is_remote(&self) -> bool {
        false
    }

    fn native_url(&self, _path: &str) -> Option<String> {
        None
    }

    fn local_root(&self) -> Option<&Path> {
        None
    }

    fn backend_type(&self) -> &'static str {
        "saturated"
    }
}

/// Controllable transcoder double. On success it writes
/// `transcoded:{profile}` / `poster-frame` markers to the output path so
/// tests can assert which branch produced the stored bytes.
pub struct MockTranscoder {
    succeed: bool,
    poster: bool,
    pub calls: Mutex<Vec<(PathBuf, PathBuf, String)>>,
}

impl MockTranscoder {
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            poster: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            poster: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VideoTranscoder for MockTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, profile: &str) -> Result<bool> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((input.to_path_buf(), output.to_path_buf(), profile.to_string()));
        if !self.succeed {
            return Ok(false);
        }
        tokio::fs::write(output, format!("transcoded:{}", profile)).await?;
        Ok(true)
    }

    async fn extract_poster(&self, _input: &Path, output: &Path) -> Result<bool> {
        if !self.poster {
            return Ok(false);
        }
        tokio::fs::write(output, b"poster-frame").await?;
        Ok(true)
    }
}

/// Registry with explicit backend instances, for doubles the factory cannot
/// build.
pub fn registry_from_backends(
    primary: Arc<dyn StorageBackend>,
    backup: Option<Arc<dyn StorageBackend>>,
    staging_root: &Path,
    policy: ReplicationPolicy,
) -> Arc<DiskRegistry> {
    use crate::storage::{Disk, DiskName, LocalStorageBackend};

    let staging = Arc::new(LocalStorageBackend::new(staging_root));
    Arc::new(DiskRegistry::new(
        Disk::new(DiskName::Primary, primary, None),
        backup.map(|backend| Disk::new(DiskName::Backup, backend, None)),
        staging,
        policy,
    ))
}
