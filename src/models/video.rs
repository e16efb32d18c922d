//! Video entity: original, transcoded copy, and poster frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub mime_type: String,
    pub file_size: u64,
    pub original_path: String,
    /// Transcoded copy; byte-equal to the original when `degraded` is set.
    pub path: String,
    /// Poster frame, the video path with its extension replaced by `.png`.
    pub thumbnail_path: String,
    pub folder_path: String,
    pub original_name: String,
    pub extension: String,
    pub hash: String,
    pub storage: String,
    /// True when the transcoder failed and the original was copied verbatim.
    /// A reported outcome, not an error.
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn artifact_paths(&self) -> Vec<&str> {
        vec![&self.original_path, &self.path, &self.thumbnail_path]
    }
}
