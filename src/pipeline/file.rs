//! Generic file manager: one stored path, no derived artifacts.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ManagerCore;
use crate::error::Result;
use crate::models::{StoredFile, Upload};
use crate::naming;

#[derive(Clone)]
pub struct FileManager {
    core: ManagerCore,
}

impl FileManager {
    pub(crate) fn new(core: ManagerCore) -> Self {
        Self { core }
    }

    /// Scope entity folders and hashes under an owner subfolder.
    pub fn with_owner_subfolder(mut self, owner: impl Into<String>) -> Self {
        self.core.owner_subfolder = Some(owner.into());
        self
    }

    /// Store a generic file under a fresh unique path.
    pub async fn create(&self, upload: &Upload) -> Result<StoredFile> {
        let mime_type = upload.resolved_mime_type();
        let meta = naming::metadata_of_upload(upload);

        let folder = self.core.entity_folder(&meta.file_name).await?;
        let path = self
            .core
            .naming
            .generate_unique_path(&folder, &meta.extension, &self.core.store)
            .await?;
        self.core.store.put(&path, &upload.bytes).await?;

        let original_name = naming::original_name(upload);
        let hash = self.core.allocate_hash(&original_name).await?;
        let url = self.core.resolver.url_for(&path);

        let now = Utc::now();
        info!(path = %path, hash = %hash, "stored file entity");
        Ok(StoredFile {
            id: Uuid::new_v4(),
            mime_type,
            file_size: upload.size(),
            path,
            url,
            folder_path: folder,
            original_name,
            extension: meta.extension,
            hash,
            storage: self.core.store.storage_name(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the entity's file with a new upload, keeping its identity.
    pub async fn update(&self, upload: &Upload, file: StoredFile) -> Result<StoredFile> {
        self.core.store.delete(&file.path).await?;
        self.core.hash_index.remove(&file.hash).await?;
        let mut fresh = self.create(upload).await?;
        fresh.id = file.id;
        fresh.created_at = file.created_at;
        Ok(fresh)
    }

    /// Move the file to a fresh unique path and refresh its URL.
    pub async fn update_file_names(&self, file: StoredFile) -> Result<StoredFile> {
        let path = self.core.rename_to_unique(&file.path).await?;
        let url = self.core.resolver.url_for(&path);

        let mut file = file;
        file.path = path;
        file.url = url;
        file.updated_at = Utc::now();
        Ok(file)
    }

    /// Delete the file and its folder once empty.
    pub async fn delete(&self, file: StoredFile) -> Result<()> {
        self.core
            .delete_entity(&file.artifact_paths(), &file.folder_path, &file.hash)
            .await
    }
}
