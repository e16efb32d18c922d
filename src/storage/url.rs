//! Public URL resolution for stored paths.
//!
//! Resolution order: explicit configured base URL, then a backend-native URL
//! (object storage), then a root-relative path served by the host
//! application. The serve-from-backup policy redirects URL building to the
//! backup disk without changing where content is written.

use std::sync::Arc;

use crate::error::Result;
use crate::naming;
use crate::storage::registry::{Disk, DiskRegistry};
use crate::storage::DiskName;

#[derive(Clone)]
pub struct UrlResolver {
    registry: Arc<DiskRegistry>,
}

impl UrlResolver {
    pub fn new(registry: Arc<DiskRegistry>) -> Self {
        Self { registry }
    }

    /// URL for a stored path on the policy-selected serving disk.
    pub fn url_for(&self, path: &str) -> String {
        self.url_on(self.registry.serving_disk(), path)
    }

    /// URL for a stored path on an explicitly chosen disk.
    pub fn url_for_disk(&self, name: DiskName, path: &str) -> Result<String> {
        Ok(self.url_on(self.registry.disk(name)?, path))
    }

    fn url_on(&self, disk: &Disk, path: &str) -> String {
        let file_url = naming::to_url_path(path);
        if let Some(base) = disk.public_base_url() {
            return format!(
                "{}/{}",
                base.trim_end_matches('/'),
                file_url.trim_start_matches('/')
            );
        }
        if let Some(native) = disk.backend().native_url(&file_url) {
            return native;
        }
        format!("/{}", file_url.trim_start_matches('/'))
    }
}
