//! Error taxonomy for storage and pipeline operations

use std::fmt;

use thiserror::Error;

use crate::storage::DiskName;

pub type Result<T> = std::result::Result<T, FileKeeperError>;

/// A single disk's write failure, kept so callers can see which replicas
/// accepted the write and which did not.
#[derive(Debug, Clone)]
pub struct DiskFailure {
    pub disk: DiskName,
    pub message: String,
}

impl fmt::Display for DiskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.disk, self.message)
    }
}

fn join_failures(failures: &[DiskFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum FileKeeperError {
    /// Invalid or missing disk configuration. Fatal, surfaced at construction.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// The object is absent on every configured disk.
    #[error("file not found on any configured disk: {path}")]
    NotFound { path: String },

    /// One or more replica writes failed. Writes to other disks are not
    /// rolled back; replication is best-effort.
    #[error("write failed on {} of {} disk(s): {}", failures.len(), failures.len() + succeeded, join_failures(failures))]
    WriteFailure {
        failures: Vec<DiskFailure>,
        succeeded: usize,
    },

    /// The bounded uniqueness search ran out of attempts.
    #[error("no unused path under {directory} after {attempts} attempts")]
    PathExhausted { directory: String, attempts: u32 },

    /// A transform was requested but the source artifact is gone.
    #[error("original file does not exist: {path}")]
    MissingOriginal { path: String },

    /// Rename source was absent on every configured disk.
    #[error("cannot rename {from}: not present on any configured disk")]
    Rename { from: String },

    /// No manager is registered for the given category tag.
    #[error("no manager resolves category {0:?}")]
    UnknownCategory(String),

    /// Hard transform failure (decode errors, unsupported rotation values).
    /// Distinct from the degraded-copy outcome, which is a flag, not an error.
    #[error("transform failed: {0}")]
    Transform(String),

    /// Backend-specific failure that is not a simple miss (network, auth,
    /// service errors).
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl FileKeeperError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileKeeperError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failure_lists_each_disk() {
        let err = FileKeeperError::WriteFailure {
            failures: vec![DiskFailure {
                disk: DiskName::Primary,
                message: "disk full".to_string(),
            }],
            succeeded: 1,
        };
        let text = err.to_string();
        assert!(text.contains("1 of 2"));
        assert!(text.contains("primary: disk full"));
    }
}
