//! filekeeper: replicated file storage with collision-free naming and
//! derived media artifacts.
//!
//! Uploaded assets are persisted across a primary disk and an optional
//! backup disk with fallback reads and best-effort write replication. The
//! artifact pipeline derives resized images, thumbnails, transcoded videos,
//! and poster frames, staging remote objects through a local scratch
//! directory whenever a transform needs real filesystem access.
//!
//! The host application constructs a [`DiskRegistry`] once at bootstrap,
//! wires it into a [`FileKeeper`], and hands uploads to the per-category
//! managers (or the tag-dispatching facade methods).

pub mod config;
pub mod error;
pub mod hash_index;
pub mod models;
pub mod naming;
pub mod pipeline;
pub mod storage;
pub mod transform;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use error::{FileKeeperError, Result};
pub use hash_index::{HashIndex, MemoryHashIndex};
pub use models::{Media, StoredFile, Upload, Video};
pub use pipeline::{Category, Entity, FileKeeper, FileManager, MediaManager, ResizeRequest, VideoManager};
pub use storage::{
    build_registry, DiskName, DiskRegistry, ReplicatedStore, ReplicationPolicy, StagingArea,
    StorageBackend, UrlResolver,
};
pub use transform::{CliTranscoder, Dimensions, Rotation, VideoTranscoder};
