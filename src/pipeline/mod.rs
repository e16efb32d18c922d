//! Artifact pipeline: per-category managers behind one facade.
//!
//! Each logical entity (image, video, generic file) is handled by a manager
//! that knows which artifacts to derive and how to keep their identities
//! consistent across resize, rotate, rename, and delete. Categories resolve
//! through a closed tag lookup, not reflection.

pub mod file;
pub mod media;
pub mod video;

use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{FileKeeperError, Result};
use crate::hash_index::{self, HashIndex};
use crate::models::{Media, StoredFile, Upload, Video};
use crate::naming::{self, PathNaming};
use crate::storage::{DiskRegistry, ReplicatedStore, StagingArea, UrlResolver};
use crate::transform::{Dimensions, Rotation, VideoTranscoder};

pub use file::FileManager;
pub use media::MediaManager;
pub use video::VideoManager;

/// Entity categories with a registered manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Media,
    Video,
    File,
}

impl FromStr for Category {
    type Err = FileKeeperError;

    fn from_str(tag: &str) -> Result<Self> {
        let lowered = tag.to_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
        match singular {
            "image" | "photo" | "media" => Ok(Category::Media),
            "video" => Ok(Category::Video),
            "file" => Ok(Category::File),
            _ => Err(FileKeeperError::UnknownCategory(tag.to_string())),
        }
    }
}

/// An entity handled by some manager, for callers that dispatch by category
/// tag instead of using the typed managers directly.
#[derive(Debug, Clone)]
pub enum Entity {
    Media(Media),
    Video(Video),
    File(StoredFile),
}

impl Entity {
    pub fn artifact_paths(&self) -> Vec<&str> {
        match self {
            Entity::Media(media) => media.artifact_paths(),
            Entity::Video(video) => video.artifact_paths(),
            Entity::File(file) => file.artifact_paths(),
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Entity::Media(media) => &media.hash,
            Entity::Video(video) => &video.hash,
            Entity::File(file) => &file.hash,
        }
    }
}

/// Parameters for a resize request; unset fields fall back to configuration.
#[derive(Debug, Clone, Default)]
pub struct ResizeRequest {
    pub image_size: Option<Dimensions>,
    pub thumbnail: Option<Dimensions>,
    /// Video transcode profile, ignored for images.
    pub profile: Option<String>,
}

/// Shared plumbing for all managers: storage access, naming, hashing, and the
/// category folder layout.
#[derive(Clone)]
pub(crate) struct ManagerCore {
    pub store: ReplicatedStore,
    pub staging: StagingArea,
    pub resolver: UrlResolver,
    pub naming: PathNaming,
    pub hash_index: Arc<dyn HashIndex>,
    pub main_folder: String,
    pub directory: String,
    pub owner_subfolder: Option<String>,
    pub hash_attempts: u32,
}

impl ManagerCore {
    /// Entity folder `{main}/{directory}/{owner?}/{stem}`, deduplicated with
    /// `_2`, `_3`, ... suffixes against existing folders.
    pub async fn entity_folder(&self, stem: &str) -> Result<String> {
        self.naming
            .entity_folder(
                &self.main_folder,
                &self.directory,
                self.owner_subfolder.as_deref(),
                stem,
                &self.store,
            )
            .await
    }

    /// Store the untouched upload under its slugified original name.
    pub async fn move_original(&self, folder: &str, upload: &Upload) -> Result<String> {
        let path = naming::join(folder, &naming::original_name(upload));
        self.store.put(&path, &upload.bytes).await?;
        Ok(path)
    }

    pub async fn check_original(&self, path: &str) -> Result<()> {
        if !self.store.exists(path).await? {
            return Err(FileKeeperError::MissingOriginal {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    /// Allocate and register a unique hash for an entity.
    pub async fn allocate_hash(&self, file_name: &str) -> Result<String> {
        let hash = hash_index::make_hash(
            self.hash_index.as_ref(),
            &self.directory,
            self.owner_subfolder.as_deref(),
            file_name,
            self.hash_attempts,
        )
        .await?;
        self.hash_index.insert(&hash).await?;
        Ok(hash)
    }

    /// Move an artifact to a fresh unique path in its own directory and
    /// return the new path.
    pub async fn rename_to_unique(&self, path: &str) -> Result<String> {
        let meta = naming::metadata_of(path);
        let fresh = self
            .naming
            .generate_unique_path(&meta.dir_name, &meta.extension, &self.store)
            .await?;
        self.store.rename(path, &fresh).await?;
        debug!(from = path, to = %fresh, "renamed artifact");
        Ok(fresh)
    }

    /// Delete every artifact path, free the hash, and drop the entity folder
    /// where it ended up empty.
    pub async fn delete_entity(&self, paths: &[&str], folder: &str, hash: &str) -> Result<()> {
        for path in paths {
            if !path.is_empty() {
                self.store.delete(path).await?;
            }
        }
        self.hash_index.remove(hash).await?;
        self.store.delete_directory_if_empty(folder).await
    }
}

/// Facade over the typed managers plus raw storage access. This is what the
/// host application holds; one instance per process.
#[derive(Clone)]
pub struct FileKeeper {
    config: Config,
    store: ReplicatedStore,
    staging: StagingArea,
    resolver: UrlResolver,
    naming: PathNaming,
    hash_index: Arc<dyn HashIndex>,
    transcoder: Arc<dyn VideoTranscoder>,
}

impl FileKeeper {
    pub fn new(
        config: Config,
        registry: Arc<DiskRegistry>,
        hash_index: Arc<dyn HashIndex>,
        transcoder: Arc<dyn VideoTranscoder>,
    ) -> Self {
        let naming = PathNaming::new(config.unique_name_attempts);
        let store = ReplicatedStore::new(registry.clone());
        let staging = StagingArea::new(store.clone(), naming.clone());
        let resolver = UrlResolver::new(registry);
        Self {
            config,
            store,
            staging,
            resolver,
            naming,
            hash_index,
            transcoder,
        }
    }

    fn core(&self, directory: &str) -> ManagerCore {
        ManagerCore {
            store: self.store.clone(),
            staging: self.staging.clone(),
            resolver: self.resolver.clone(),
            naming: self.naming.clone(),
            hash_index: self.hash_index.clone(),
            main_folder: self.config.main_folder.clone(),
            directory: directory.to_string(),
            owner_subfolder: None,
            hash_attempts: self.config.unique_name_attempts,
        }
    }

    pub fn media(&self) -> MediaManager {
        MediaManager::new(self.core(&self.config.media.directory), self.config.media.clone())
    }

    pub fn video(&self) -> VideoManager {
        VideoManager::new(
            self.core(&self.config.video.directory),
            self.config.video.clone(),
            self.transcoder.clone(),
        )
    }

    pub fn files(&self) -> FileManager {
        FileManager::new(self.core(&self.config.files.directory))
    }

    pub fn store(&self) -> &ReplicatedStore {
        &self.store
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn urls(&self) -> &UrlResolver {
        &self.resolver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read stored content with fallback across disks.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.store.get(path).await
    }

    /// Public URL for a stored path.
    pub fn url(&self, path: &str) -> String {
        self.resolver.url_for(path)
    }

    /// Create an entity in the category named by `tag`.
    pub async fn create(&self, tag: &str, upload: &Upload) -> Result<Entity> {
        match tag.parse::<Category>()? {
            Category::Media => Ok(Entity::Media(self.media().create(upload).await?)),
            Category::Video => Ok(Entity::Video(self.video().create(upload).await?)),
            Category::File => Ok(Entity::File(self.files().create(upload).await?)),
        }
    }

    /// Replace an entity's files with a new upload, keeping its identity.
    pub async fn update(&self, upload: &Upload, entity: Entity) -> Result<Entity> {
        match entity {
            Entity::Media(media) => Ok(Entity::Media(self.media().update(upload, media).await?)),
            Entity::Video(video) => Ok(Entity::Video(self.video().update(upload, video).await?)),
            Entity::File(file) => Ok(Entity::File(self.files().update(upload, file).await?)),
        }
    }

    /// Recompute derived artifacts. Generic files pass through unchanged.
    pub async fn resize(&self, entity: Entity, request: ResizeRequest) -> Result<Entity> {
        match entity {
            Entity::Media(media) => Ok(Entity::Media(self.media().resize(media, request).await?)),
            Entity::Video(video) => Ok(Entity::Video(
                self.video().resize(video, request.profile.as_deref()).await?,
            )),
            Entity::File(file) => Ok(Entity::File(file)),
        }
    }

    /// Rotate image artifacts. Videos and generic files pass through
    /// unchanged.
    pub async fn rotate(&self, entity: Entity, rotation: Rotation) -> Result<Entity> {
        match entity {
            Entity::Media(media) => Ok(Entity::Media(self.media().rotate(media, rotation).await?)),
            other => Ok(other),
        }
    }

    /// Move every artifact to a fresh unique path.
    pub async fn update_file_names(&self, entity: Entity) -> Result<Entity> {
        match entity {
            Entity::Media(media) => {
                Ok(Entity::Media(self.media().update_file_names(media).await?))
            }
            Entity::Video(video) => {
                Ok(Entity::Video(self.video().update_file_names(video).await?))
            }
            Entity::File(file) => Ok(Entity::File(self.files().update_file_names(file).await?)),
        }
    }

    /// Delete every artifact and the entity's folder where it ended up empty.
    pub async fn delete(&self, entity: Entity) -> Result<()> {
        match entity {
            Entity::Media(media) => self.media().delete(media).await,
            Entity::Video(video) => self.video().delete(video).await,
            Entity::File(file) => self.files().delete(file).await,
        }
    }
}
