//! Temporary local staging for remote-backed objects.
//!
//! Image and video tools need real filesystem paths. When every disk holding
//! an object is remote, the object is materialized under a dedicated
//! sub-directory of the local staging disk and removed again once the
//! transform is done. Objects already present on a local disk pass through
//! untouched.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{FileKeeperError, Result};
use crate::naming::{self, PathNaming};
use crate::storage::replicated::ReplicatedStore;
use crate::storage::StorageBackend;

/// Sub-directory on the staging disk that scoped copies live under. The
/// release guard refuses to delete anything outside it.
pub const STAGING_DIR: &str = "tmp_files";

/// A local filesystem handle for a stored object. When `staged_relative` is
/// set this handle owns a scratch copy on the staging disk; otherwise it
/// points straight at a local disk's file and must never be deleted.
pub struct Staged {
    absolute: PathBuf,
    staged_relative: Option<String>,
    released: bool,
}

impl Staged {
    pub fn path(&self) -> &Path {
        &self.absolute
    }

    pub fn is_staged(&self) -> bool {
        self.staged_relative.is_some()
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        // Backstop for exits that skip release (panics, early returns in
        // caller code holding the handle).
        if !self.released {
            if let Some(relative) = &self.staged_relative {
                if relative.starts_with(STAGING_DIR) {
                    let _ = std::fs::remove_file(&self.absolute);
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct StagingArea {
    store: ReplicatedStore,
    naming: PathNaming,
}

impl StagingArea {
    pub fn new(store: ReplicatedStore, naming: PathNaming) -> Self {
        Self { store, naming }
    }

    /// Make the object available at a real local path. Remote-only objects
    /// are copied onto the staging disk; locally stored objects are returned
    /// as-is.
    pub async fn materialize(&self, path: &str) -> Result<Staged> {
        if let Some(local) = self.store.first_local_path(path).await? {
            debug!(path, local = %local.display(), "object is local, skipping staging");
            return Ok(Staged {
                absolute: local,
                staged_relative: None,
                released: false,
            });
        }

        let contents = self.store.get(path).await?;
        let extension = naming::metadata_of(path).extension;
        let staging = self.store.registry().staging().clone();
        let relative = self
            .naming
            .generate_unique_path_on(STAGING_DIR, &extension, staging.as_ref() as &dyn StorageBackend)
            .await?;
        staging.write(&relative, &contents).await?;
        let absolute = staging.full_path(&relative);
        debug!(path, staged = %absolute.display(), "materialized remote object");
        Ok(Staged {
            absolute,
            staged_relative: Some(relative),
            released: false,
        })
    }

    /// A unique writable slot on the staging disk for tool output.
    pub async fn scratch(&self, extension: &str) -> Result<Staged> {
        let staging = self.store.registry().staging().clone();
        let relative = self
            .naming
            .generate_unique_path_on(STAGING_DIR, extension, staging.as_ref() as &dyn StorageBackend)
            .await?;
        let absolute = staging.full_path(&relative);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(Staged {
            absolute,
            staged_relative: Some(relative),
            released: false,
        })
    }

    /// Read a staged file's bytes.
    pub async fn read(&self, staged: &Staged) -> Result<Vec<u8>> {
        match tokio::fs::read(&staged.absolute).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileKeeperError::NotFound {
                    path: staged.absolute.to_string_lossy().into_owned(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the staged copy. A no-op for handles that point at a real disk
    /// file; the staging-prefix check keeps this from ever deleting anything
    /// outside the staging sub-directory.
    pub async fn release(&self, mut staged: Staged) -> Result<()> {
        staged.released = true;
        let Some(relative) = staged.staged_relative.take() else {
            return Ok(());
        };
        if !relative.starts_with(STAGING_DIR) {
            warn!(path = %relative, "refusing to delete a path outside the staging directory");
            return Ok(());
        }
        self.store.registry().staging().delete(&relative).await
    }

    /// Materialize, run `f` on the local path, release on every exit path.
    pub async fn scoped<T, F, Fut>(&self, path: &str, f: F) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let staged = self.materialize(path).await?;
        let local = staged.path().to_path_buf();
        let result = f(local).await;
        if let Err(e) = self.release(staged).await {
            warn!(path, error = %e, "failed to release staged copy");
        }
        result
    }

    /// Drop the whole staging sub-directory.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .registry()
            .staging()
            .delete_directory(STAGING_DIR)
            .await
    }
}
