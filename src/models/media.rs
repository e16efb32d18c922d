//! Image entity: original plus the served main image and thumbnail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: Uuid,
    pub mime_type: String,
    pub file_size: u64,
    /// Untouched upload, kept as the source for every later resize.
    pub original_path: String,
    /// Served main image, resized to the configured image size.
    pub path: String,
    pub thumbnail_path: String,
    /// Entity folder that owns all artifact paths.
    pub folder_path: String,
    pub original_name: String,
    pub extension: String,
    /// Unique token from the hash index, stable across renames.
    pub hash: String,
    /// Name of the disk the entity was stored through.
    pub storage: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Media {
    /// Every artifact path bound to this entity, original included.
    pub fn artifact_paths(&self) -> Vec<&str> {
        vec![&self.original_path, &self.path, &self.thumbnail_path]
    }
}
