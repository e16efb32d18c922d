//! Library configuration
//!
//! Mirrors the deployment knobs of the attachment storage layer: one mandatory
//! primary disk, an optional backup disk, a guaranteed-local staging root, and
//! per-category defaults for derived artifacts. Loadable from environment
//! variables for server deployments, or built directly in code.

use serde::{Deserialize, Serialize};

use crate::error::{FileKeeperError, Result};
use crate::transform::Dimensions;

/// Default ceiling for bounded uniqueness searches (path and hash generation).
pub const DEFAULT_UNIQUE_NAME_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Common top folder for all stored files, e.g. `files/...`
    pub main_folder: String,
    /// Retry ceiling for unique path / hash generation.
    pub unique_name_attempts: u32,
    pub media: MediaConfig,
    pub video: VideoConfig,
    pub files: FilesConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Category folder under the main folder, `files/{directory}`.
    pub directory: String,
    /// Size of the served main image. Has no impact on the stored original.
    pub image_size: Dimensions,
    pub thumbnail: Dimensions,
    /// Rename artifacts after resize/rotate so browser caches drop stale copies.
    pub update_names_on_change: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub directory: String,
    /// Transcoder quality profile. Known values: 2160p60, 1080p30, 720p30,
    /// 576p25, 480p30.
    pub profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Mandatory. Missing primary configuration fails registry construction.
    pub primary: Option<DiskConfig>,
    pub backup: Option<DiskConfig>,
    /// Local directory backing the staging disk.
    pub staging_root: String,
    /// If true, public URLs point at the backup disk instead of the primary.
    pub serve_from_backup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    pub driver: DiskDriver,
    /// Explicit public base URL. Takes precedence over any backend-native URL.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiskDriver {
    Local { root: String },
    #[cfg(feature = "s3")]
    S3(S3DiskConfig),
}

#[cfg(feature = "s3")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3DiskConfig {
    pub bucket_name: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible services (MinIO etc.)
    pub endpoint_url: Option<String>,
    /// Key prefix prepended to every stored path.
    pub prefix: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_folder: "files".to_string(),
            unique_name_attempts: DEFAULT_UNIQUE_NAME_ATTEMPTS,
            media: MediaConfig::default(),
            video: VideoConfig::default(),
            files: FilesConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            directory: "media".to_string(),
            image_size: Dimensions::width(500),
            thumbnail: Dimensions::new(250, 250),
            update_names_on_change: true,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            directory: "video".to_string(),
            profile: "576p25".to_string(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            directory: "files".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            primary: None,
            backup: None,
            staging_root: "./storage/staging".to_string(),
            serve_from_backup: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, with `.env` support.
    ///
    /// Only local disks can be described through the environment; S3 disks are
    /// wired up in code where credentials management belongs to the host
    /// application.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Config::default();

        if let Ok(folder) = std::env::var("FILEKEEPER_MAIN_FOLDER") {
            config.main_folder = folder;
        }

        if let Ok(root) = std::env::var("FILEKEEPER_PRIMARY_ROOT") {
            config.storage.primary = Some(DiskConfig {
                driver: DiskDriver::Local { root },
                public_url: std::env::var("FILEKEEPER_PRIMARY_URL").ok(),
            });
        }

        if let Ok(root) = std::env::var("FILEKEEPER_BACKUP_ROOT") {
            config.storage.backup = Some(DiskConfig {
                driver: DiskDriver::Local { root },
                public_url: std::env::var("FILEKEEPER_BACKUP_URL").ok(),
            });
        }

        if let Ok(root) = std::env::var("FILEKEEPER_STAGING_ROOT") {
            config.storage.staging_root = root;
        }

        if let Ok(value) = std::env::var("FILEKEEPER_SERVE_FROM_BACKUP") {
            config.storage.serve_from_backup = parse_bool("FILEKEEPER_SERVE_FROM_BACKUP", &value)?;
        }

        if let Ok(value) = std::env::var("FILEKEEPER_IMAGE_SIZE") {
            config.media.image_size = parse_dimensions("FILEKEEPER_IMAGE_SIZE", &value)?;
        }

        if let Ok(value) = std::env::var("FILEKEEPER_THUMBNAIL_SIZE") {
            config.media.thumbnail = parse_dimensions("FILEKEEPER_THUMBNAIL_SIZE", &value)?;
        }

        if let Ok(value) = std::env::var("FILEKEEPER_UPDATE_NAMES_ON_CHANGE") {
            config.media.update_names_on_change =
                parse_bool("FILEKEEPER_UPDATE_NAMES_ON_CHANGE", &value)?;
        }

        if let Ok(profile) = std::env::var("FILEKEEPER_VIDEO_PROFILE") {
            config.video.profile = profile;
        }

        if let Ok(value) = std::env::var("FILEKEEPER_UNIQUE_NAME_ATTEMPTS") {
            config.unique_name_attempts = value.parse().map_err(|_| {
                FileKeeperError::Configuration(format!(
                    "FILEKEEPER_UNIQUE_NAME_ATTEMPTS must be a positive integer, got {:?}",
                    value
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not require touching storage.
    pub fn validate(&self) -> Result<()> {
        if self.unique_name_attempts == 0 {
            return Err(FileKeeperError::Configuration(
                "unique_name_attempts must be at least 1".to_string(),
            ));
        }
        for disk in [&self.storage.primary, &self.storage.backup]
            .into_iter()
            .flatten()
        {
            if let Some(base) = &disk.public_url {
                url::Url::parse(base).map_err(|e| {
                    FileKeeperError::Configuration(format!(
                        "invalid public URL {:?}: {}",
                        base, e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(FileKeeperError::Configuration(format!(
            "{} must be a boolean, got {:?}",
            name, other
        ))),
    }
}

/// Accepts `500` (width, aspect-locked height) or `250x250` (bounding box).
fn parse_dimensions(name: &str, value: &str) -> Result<Dimensions> {
    let parse_side = |side: &str| -> Result<u32> {
        side.trim().parse().map_err(|_| {
            FileKeeperError::Configuration(format!(
                "{} must look like `500` or `250x250`, got {:?}",
                name, value
            ))
        })
    };

    match value.split_once(['x', 'X']) {
        Some((w, h)) => Ok(Dimensions::new(parse_side(w)?, parse_side(h)?)),
        None => Ok(Dimensions::width(parse_side(value)?)),
    }
}
