//! Unique per-entity path tokens.
//!
//! Every entity gets a hash of the form `{category}/[{owner}/]{[n-]}name`,
//! checked against a persisted index so two uploads with the same name stay
//! distinguishable. The index is a trait seam: the host application usually
//! backs it with its database; the in-memory implementation serves tests and
//! single-process embedding.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{FileKeeperError, Result};

#[async_trait]
pub trait HashIndex: Send + Sync {
    async fn contains(&self, hash: &str) -> Result<bool>;

    /// Record a hash as taken. Called after generation succeeds.
    async fn insert(&self, hash: &str) -> Result<()>;

    /// Free a hash when its entity is deleted.
    async fn remove(&self, hash: &str) -> Result<()>;
}

/// Generate a collision-free hash, suffixing `2-`, `3-`, ... while the index
/// already holds the candidate. Check-then-act like the path search; the
/// bounded loop turns runaway collisions into a typed failure.
pub async fn make_hash(
    index: &dyn HashIndex,
    category_dir: &str,
    owner_subfolder: Option<&str>,
    file_name: &str,
    attempts: u32,
) -> Result<String> {
    let prefix = match owner_subfolder {
        Some(owner) => format!("{}/{}", category_dir, owner),
        None => category_dir.to_string(),
    };

    let candidate = format!("{}/{}", prefix, file_name);
    if !index.contains(&candidate).await? {
        return Ok(candidate);
    }
    for increment in 2..2 + attempts {
        let candidate = format!("{}/{}-{}", prefix, increment, file_name);
        if !index.contains(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(FileKeeperError::PathExhausted {
        directory: prefix,
        attempts,
    })
}

/// In-memory index for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryHashIndex {
    entries: Mutex<HashSet<String>>,
}

impl MemoryHashIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HashIndex for MemoryHashIndex {
    async fn contains(&self, hash: &str) -> Result<bool> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).contains(hash))
    }

    async fn insert(&self, hash: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(hash.to_string());
        Ok(())
    }

    async fn remove(&self, hash: &str) -> Result<()> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increments_on_collision() {
        let index = MemoryHashIndex::new();
        let first = make_hash(&index, "media", None, "photo.png", 20).await.unwrap();
        assert_eq!(first, "media/photo.png");
        index.insert(&first).await.unwrap();

        let second = make_hash(&index, "media", None, "photo.png", 20).await.unwrap();
        assert_eq!(second, "media/2-photo.png");
        index.insert(&second).await.unwrap();

        let third = make_hash(&index, "media", None, "photo.png", 20).await.unwrap();
        assert_eq!(third, "media/3-photo.png");
    }

    #[tokio::test]
    async fn owner_subfolder_scopes_the_hash() {
        let index = MemoryHashIndex::new();
        let hash = make_hash(&index, "media", Some("user42"), "photo.png", 20)
            .await
            .unwrap();
        assert_eq!(hash, "media/user42/photo.png");
    }

    #[tokio::test]
    async fn exhausts_after_the_retry_ceiling() {
        struct Saturated;

        #[async_trait]
        impl HashIndex for Saturated {
            async fn contains(&self, _hash: &str) -> Result<bool> {
                Ok(true)
            }
            async fn insert(&self, _hash: &str) -> Result<()> {
                Ok(())
            }
            async fn remove(&self, _hash: &str) -> Result<()> {
                Ok(())
            }
        }

        let err = make_hash(&Saturated, "media", None, "photo.png", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, FileKeeperError::PathExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn removed_hashes_are_reusable() {
        let index = MemoryHashIndex::new();
        index.insert("media/photo.png").await.unwrap();
        index.remove("media/photo.png").await.unwrap();
        let hash = make_hash(&index, "media", None, "photo.png", 20).await.unwrap();
        assert_eq!(hash, "media/photo.png");
    }
}
