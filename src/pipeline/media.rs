//! Image manager: original, resized main image, and thumbnail.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ManagerCore, ResizeRequest};
use crate::config::MediaConfig;
use crate::error::Result;
use crate::models::{Media, Upload};
use crate::naming;
use crate::transform::{image, Dimensions, RasterFormat, Rotation};

#[derive(Clone)]
pub struct MediaManager {
    core: ManagerCore,
    config: MediaConfig,
}

impl MediaManager {
    pub(crate) fn new(core: ManagerCore, config: MediaConfig) -> Self {
        Self { core, config }
    }

    /// Scope entity folders and hashes under an owner subfolder.
    pub fn with_owner_subfolder(mut self, owner: impl Into<String>) -> Self {
        self.core.owner_subfolder = Some(owner.into());
        self
    }

    /// Store an image entity: the untouched original plus a resized main
    /// image and thumbnail. Non-raster formats (svg and friends) skip the
    /// codec and are stored verbatim three times.
    pub async fn create(&self, upload: &Upload) -> Result<Media> {
        let mime_type = upload.resolved_mime_type();
        let raster = RasterFormat::from_mime(&mime_type);
        let meta = naming::metadata_of_upload(upload);

        let folder = self.core.entity_folder(&meta.file_name).await?;
        let path = self
            .derive_and_store(upload, raster, self.config.image_size, &folder, &meta.extension)
            .await?;
        let thumbnail_path = self
            .derive_and_store(upload, raster, self.config.thumbnail, &folder, &meta.extension)
            .await?;

        let original_name = naming::original_name(upload);
        let hash = self.core.allocate_hash(&original_name).await?;
        let original_path = self.core.move_original(&folder, upload).await?;

        let now = Utc::now();
        info!(folder = %folder, hash = %hash, "created media entity");
        Ok(Media {
            id: Uuid::new_v4(),
            mime_type,
            file_size: upload.size(),
            original_path,
            path,
            thumbnail_path,
            folder_path: folder,
            original_name,
            extension: meta.extension,
            hash,
            storage: self.core.store.storage_name(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the entity's files with a new upload, keeping its identity.
    pub async fn update(&self, upload: &Upload, media: Media) -> Result<Media> {
        for path in media.artifact_paths() {
            if !path.is_empty() {
                self.core.store.delete(path).await?;
            }
        }
        self.core.hash_index.remove(&media.hash).await?;
        let mut fresh = self.create(upload).await?;
        fresh.id = media.id;
        fresh.created_at = media.created_at;
        Ok(fresh)
    }

    /// Recompute main image and thumbnail from the original. Formats the
    /// codec cannot transform pass through unchanged.
    pub async fn resize(&self, media: Media, request: ResizeRequest) -> Result<Media> {
        let Some(raster) = RasterFormat::from_mime(&media.mime_type) else {
            return Ok(media);
        };
        self.core.check_original(&media.original_path).await?;

        let image_size = request.image_size.unwrap_or(self.config.image_size);
        let thumbnail_size = request.thumbnail.unwrap_or(self.config.thumbnail);

        let resized = self
            .resize_from_original(&media.original_path, image_size, raster)
            .await?;
        self.core.store.put(&media.path, &resized).await?;

        let thumb = self
            .resize_from_original(&media.original_path, thumbnail_size, raster)
            .await?;
        self.core.store.put(&media.thumbnail_path, &thumb).await?;

        let mut media = media;
        media.updated_at = Utc::now();
        if self.config.update_names_on_change {
            return self.update_file_names(media).await;
        }
        Ok(media)
    }

    /// Rotate the main image and thumbnail in place. A true no-op for
    /// untransformable formats: the entity is returned unchanged and storage
    /// is never touched.
    pub async fn rotate(&self, media: Media, rotation: Rotation) -> Result<Media> {
        let Some(raster) = RasterFormat::from_mime(&media.mime_type) else {
            return Ok(media);
        };
        let quarter_turns = rotation.quarter_turns()?;
        if quarter_turns == 0 {
            return Ok(media);
        }

        self.rotate_path(&media.path, quarter_turns, raster).await?;
        self.rotate_path(&media.thumbnail_path, quarter_turns, raster)
            .await?;

        let mut media = media;
        media.updated_at = Utc::now();
        if self.config.update_names_on_change {
            return self.update_file_names(media).await;
        }
        Ok(media)
    }

    /// Move every artifact to a fresh unique path in its directory. The
    /// record is updated only after all moves succeed.
    pub async fn update_file_names(&self, media: Media) -> Result<Media> {
        let original_path = self.core.rename_to_unique(&media.original_path).await?;
        let path = self.core.rename_to_unique(&media.path).await?;
        let thumbnail_path = self.core.rename_to_unique(&media.thumbnail_path).await?;

        let mut media = media;
        media.original_path = original_path;
        media.path = path;
        media.thumbnail_path = thumbnail_path;
        media.updated_at = Utc::now();
        Ok(media)
    }

    /// Delete every artifact and the entity folder once it is empty.
    pub async fn delete(&self, media: Media) -> Result<()> {
        self.core
            .delete_entity(&media.artifact_paths(), &media.folder_path, &media.hash)
            .await
    }

    async fn derive_and_store(
        &self,
        upload: &Upload,
        raster: Option<RasterFormat>,
        size: Dimensions,
        folder: &str,
        extension: &str,
    ) -> Result<String> {
        let path = self
            .core
            .naming
            .generate_unique_path(folder, extension, &self.core.store)
            .await?;
        let bytes = match raster {
            Some(format) => image::resize_bytes(&upload.bytes, size, format)?,
            None => upload.bytes.clone(),
        };
        self.core.store.put(&path, &bytes).await?;
        Ok(path)
    }

    async fn resize_from_original(
        &self,
        original_path: &str,
        size: Dimensions,
        format: RasterFormat,
    ) -> Result<Vec<u8>> {
        self.core
            .staging
            .scoped(original_path, |local| async move {
                image::resize_file(&local, size, format)
            })
            .await
    }

    async fn rotate_path(&self, path: &str, quarter_turns: u32, format: RasterFormat) -> Result<()> {
        if !self.core.store.exists(path).await? {
            warn!(path, "rotate target missing, skipping");
            return Ok(());
        }
        let rotated = self
            .core
            .staging
            .scoped(path, |local| async move {
                image::rotate_file(&local, quarter_turns, format)
            })
            .await?;
        self.core.store.put(path, &rotated).await
    }
}
