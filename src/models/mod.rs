// Re-export all model types for ease of use

pub mod file;
pub mod media;
pub mod upload;
pub mod video;

pub use file::StoredFile;
pub use media::Media;
pub use upload::Upload;
pub use video::Video;
