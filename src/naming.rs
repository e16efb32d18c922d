//! Path and name generation.
//!
//! Builds the hierarchical folder layout
//! `{main_folder}/{category}/{owner?}/{entity_folder}/{slug}.{ext}`, slugifies
//! client-supplied names, and searches for unused random filenames across all
//! configured disks. Uniqueness is check-then-act: the search never reserves a
//! path, so concurrent writers into one directory can race. The bounded retry
//! converts the pathological case into a typed `PathExhausted` failure instead
//! of unbounded recursion.

use std::path::Path;

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FileKeeperError, Result};
use crate::models::Upload;
use crate::storage::{ReplicatedStore, StorageBackend};

const RANDOM_NAME_LEN: usize = 16;

/// Lowercase the input and collapse every non-alphanumeric run into a single
/// underscore.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_sep = true;
    for c in input.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Join two path parts with a single forward slash.
pub fn join(part1: &str, part2: &str) -> String {
    format!(
        "{}/{}",
        part1.trim_end_matches('/'),
        part2.trim_start_matches('/')
    )
}

/// Normalize a stored path for URL emission regardless of host separators.
pub fn to_url_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Storage-visible name for an upload: slugified stem plus the original
/// extension.
pub fn original_name(upload: &Upload) -> String {
    let meta = metadata_of(&upload.original_name);
    let stem = slugify(&meta.file_name);
    if meta.extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, meta.extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Filename without directory or extension.
    pub file_name: String,
    /// Filename with extension.
    pub base_name: String,
    /// Containing directory, empty for bare names.
    pub dir_name: String,
    pub extension: String,
}

/// Parse a stored path into its parts.
pub fn metadata_of(path: &str) -> FileMetadata {
    let p = Path::new(path);
    let file_name = p
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base_name = p
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir_name = p
        .parent()
        .map(|s| to_url_path(&s.to_string_lossy()))
        .unwrap_or_default();
    let extension = p
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    FileMetadata {
        file_name,
        base_name,
        dir_name,
        extension,
    }
}

/// Metadata for an inbound upload: the stem is slugified, everything else
/// derives from the client-supplied name.
pub fn metadata_of_upload(upload: &Upload) -> FileMetadata {
    metadata_of(&original_name(upload))
}

/// Random-name generator with a bounded uniqueness search.
#[derive(Debug, Clone)]
pub struct PathNaming {
    attempts: u32,
}

impl PathNaming {
    pub fn new(attempts: u32) -> Self {
        Self { attempts }
    }

    /// A random lowercase slug plus extension. Does not guarantee uniqueness
    /// by itself; callers check existence.
    pub fn unique_name(&self, extension: &str) -> String {
        let slug: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_NAME_LEN)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        if extension.is_empty() {
            slug
        } else {
            format!("{}.{}", slug, extension)
        }
    }

    /// Find a path under `directory` that no configured disk currently has.
    pub async fn generate_unique_path(
        &self,
        directory: &str,
        extension: &str,
        store: &ReplicatedStore,
    ) -> Result<String> {
        for attempt in 0..self.attempts {
            let candidate = join(directory, &self.unique_name(extension));
            if !store.exists(&candidate).await? {
                debug!(path = %candidate, attempt, "allocated unique path");
                return Ok(candidate);
            }
        }
        Err(FileKeeperError::PathExhausted {
            directory: directory.to_string(),
            attempts: self.attempts,
        })
    }

    /// Same search against a single backend, used for staging scratch names.
    pub async fn generate_unique_path_on(
        &self,
        directory: &str,
        extension: &str,
        backend: &dyn StorageBackend,
    ) -> Result<String> {
        for _ in 0..self.attempts {
            let candidate = join(directory, &self.unique_name(extension));
            if !backend.exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(FileKeeperError::PathExhausted {
            directory: directory.to_string(),
            attempts: self.attempts,
        })
    }

    /// Entity folder `{main}/{category}/{owner?}/{stem}`, suffixed `_2`, `_3`,
    /// ... while a disk already has a folder of that name.
    pub async fn entity_folder(
        &self,
        main_folder: &str,
        category_dir: &str,
        owner_subfolder: Option<&str>,
        stem: &str,
        store: &ReplicatedStore,
    ) -> Result<String> {
        let mut prefix = join(main_folder, category_dir);
        if let Some(owner) = owner_subfolder {
            prefix = join(&prefix, owner);
        }

        let base = join(&prefix, stem);
        if !store.exists(&base).await? {
            return Ok(base);
        }
        for index in 2..2 + self.attempts {
            let candidate = format!("{}_{}", base, index);
            if !store.exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(FileKeeperError::PathExhausted {
            directory: prefix,
            attempts: self.attempts,
        })
    }
}
