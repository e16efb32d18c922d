//! Generic file entity: a single stored path, no derived artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: Uuid,
    pub mime_type: String,
    pub file_size: u64,
    pub path: String,
    /// Public URL resolved at store time.
    pub url: String,
    pub folder_path: String,
    pub original_name: String,
    pub extension: String,
    pub hash: String,
    pub storage: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn artifact_paths(&self) -> Vec<&str> {
        vec![&self.path]
    }
}
