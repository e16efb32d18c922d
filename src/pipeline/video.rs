//! Video manager: original, transcoded copy, and poster frame.
//!
//! Transcoding runs through the injected [`VideoTranscoder`] capability. A
//! failed transcode never fails the operation: the original is copied
//! verbatim into the target path and the entity is flagged `degraded`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ManagerCore;
use crate::config::VideoConfig;
use crate::error::Result;
use crate::models::{Upload, Video};
use crate::naming;
use crate::transform::VideoTranscoder;

/// Poster frame path: the video path with its extension replaced by `.png`.
pub fn poster_path(video_path: &str) -> String {
    let meta = naming::metadata_of(video_path);
    if meta.dir_name.is_empty() {
        format!("{}.png", meta.file_name)
    } else {
        format!("{}/{}.png", meta.dir_name, meta.file_name)
    }
}

#[derive(Clone)]
pub struct VideoManager {
    core: ManagerCore,
    config: VideoConfig,
    transcoder: Arc<dyn VideoTranscoder>,
}

impl VideoManager {
    pub(crate) fn new(
        core: ManagerCore,
        config: VideoConfig,
        transcoder: Arc<dyn VideoTranscoder>,
    ) -> Self {
        Self {
            core,
            config,
            transcoder,
        }
    }

    /// Scope entity folders and hashes under an owner subfolder.
    pub fn with_owner_subfolder(mut self, owner: impl Into<String>) -> Self {
        self.core.owner_subfolder = Some(owner.into());
        self
    }

    /// Store a video entity: the untouched original, a transcoded copy at
    /// the configured profile, and a poster frame.
    pub async fn create(&self, upload: &Upload) -> Result<Video> {
        let mime_type = upload.resolved_mime_type();
        let meta = naming::metadata_of_upload(upload);

        let folder = self.core.entity_folder(&meta.file_name).await?;
        let original_name = naming::original_name(upload);
        let hash = self.core.allocate_hash(&original_name).await?;
        let original_path = self.core.move_original(&folder, upload).await?;

        let path = self
            .core
            .naming
            .generate_unique_path(&folder, &meta.extension, &self.core.store)
            .await?;
        let degraded = self
            .transcode_into(&original_path, &path, &self.config.profile)
            .await?;
        let thumbnail_path = poster_path(&path);

        let now = Utc::now();
        info!(folder = %folder, hash = %hash, degraded, "created video entity");
        Ok(Video {
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
            degraded,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the entity's files with a new upload, keeping its identity.
    pub async fn update(&self, upload: &Upload, video: Video) -> Result<Video> {
        for path in video.artifact_paths() {
            if !path.is_empty() {
                self.core.store.delete(path).await?;
            }
        }
        self.core.hash_index.remove(&video.hash).await?;
        let mut fresh = self.create(upload).await?;
        fresh.id = video.id;
        fresh.created_at = video.created_at;
        Ok(fresh)
    }

    /// Re-transcode from the original into the existing path, optionally
    /// with a different quality profile.
    pub async fn resize(&self, video: Video, profile: Option<&str>) -> Result<Video> {
        self.core.check_original(&video.original_path).await?;
        let profile = profile.unwrap_or(&self.config.profile);
        let degraded = self
            .transcode_into(&video.original_path, &video.path, profile)
            .await?;

        let mut video = video;
        video.degraded = degraded;
        video.updated_at = Utc::now();
        Ok(video)
    }

    /// Move every artifact to a fresh unique path. The poster keeps its
    /// naming convention by following the video path's new stem.
    pub async fn update_file_names(&self, video: Video) -> Result<Video> {
        let original_path = self.core.rename_to_unique(&video.original_path).await?;
        let path = self.core.rename_to_unique(&video.path).await?;
        let new_poster = poster_path(&path);
        if self.core.store.exists(&video.thumbnail_path).await? {
            self.core.store.rename(&video.thumbnail_path, &new_poster).await?;
        }

        let mut video = video;
        video.original_path = original_path;
        video.path = path;
        video.thumbnail_path = new_poster;
        video.updated_at = Utc::now();
        Ok(video)
    }

    /// Delete every artifact and the entity folder once it is empty.
    pub async fn delete(&self, video: Video) -> Result<()> {
        self.core
            .delete_entity(&video.artifact_paths(), &video.folder_path, &video.hash)
            .await
    }

    /// Transcode `from` into `to`, falling back to a verbatim copy when the
    /// tool fails. Also refreshes the poster frame. Returns the degraded
    /// outcome flag.
    async fn transcode_into(&self, from: &str, to: &str, profile: &str) -> Result<bool> {
        let staging = self.core.staging.clone();
        let store = self.core.store.clone();
        let transcoder = self.transcoder.clone();
        let from_path = from.to_string();
        let to_path = to.to_string();
        let poster = poster_path(to);
        let out_extension = naming::metadata_of(to).extension;
        let profile = profile.to_string();

        self.core
            .staging
            .scoped(from, |local_in| async move {
                let scratch = staging.scratch(&out_extension).await?;
                let transcoded = transcoder
                    .transcode(&local_in, scratch.path(), &profile)
                    .await?;
                let degraded = if transcoded {
                    let bytes = staging.read(&scratch).await?;
                    store.put(&to_path, &bytes).await?;
                    false
                } else {
                    warn!(
                        from = %from_path,
                        to = %to_path,
                        "transcoder failed, storing a verbatim copy of the original"
                    );
                    let original = store.get(&from_path).await?;
                    store.put(&to_path, &original).await?;
                    true
                };
                staging.release(scratch).await?;

                let poster_scratch = staging.scratch("png").await?;
                let has_poster = transcoder
                    .extract_poster(&local_in, poster_scratch.path())
                    .await?;
                if has_poster {
                    let bytes = staging.read(&poster_scratch).await?;
                    store.put(&poster, &bytes).await?;
                } else {
                    warn!(video = %to_path, "no poster frame produced");
                }
                staging.release(poster_scratch).await?;

                Ok(degraded)
            })
            .await
    }
}
