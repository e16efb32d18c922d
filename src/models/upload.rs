//! Inbound upload handle: raw bytes plus the client-supplied original name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    /// Original filename as supplied by the client. Untrusted; only its
    /// slugified stem and extension ever reach storage paths.
    pub original_name: String,
    pub bytes: Vec<u8>,
    /// Explicit mime type override. When absent the type is sniffed from the
    /// content with a fallback to extension-based guessing.
    pub mime_type: Option<String>,
}

impl Upload {
    pub fn new(original_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Resolved mime type: explicit override, then content sniffing, then
    /// extension guess, then `application/octet-stream`.
    pub fn resolved_mime_type(&self) -> String {
        if let Some(explicit) = &self.mime_type {
            return explicit.clone();
        }
        if let Some(kind) = infer::get(&self.bytes) {
            return kind.mime_type().to_string();
        }
        mime_guess::from_path(&self.original_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
