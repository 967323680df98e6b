//! Sharded on-disk cache.
//!
//! Each entry is a single file holding the raw bytes, located at
//! `<root>/<path_for(key_for(url))>`. Writes overwrite in place.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::key::{key_for, CacheKey};

/// Errors from cache storage operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache key too short: {key:?}")]
    KeyTooShort { key: String },

    #[error("cache key is not ASCII: {key:?}")]
    InvalidKey { key: String },

    #[error("cache entry not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Whether the error means the entry simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// File cache rooted at a directory, sharded by key prefix.
#[derive(Debug, Clone)]
pub struct ShardedCache {
    root: PathBuf,
}

impl ShardedCache {
    /// Create a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry for `url`.
    pub fn entry_path(&self, url: &str) -> Result<PathBuf, CacheError> {
        Ok(self.root.join(key_for(url).shard_path()?))
    }

    /// Read the cached bytes for `url`.
    pub async fn get(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.entry_path(url)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| CacheError::io(&path, e))?;

        debug!(url = %url, path = %path.display(), size = data.len(), "Cache read");
        Ok(data)
    }

    /// Store `data` for `url`, replacing any previous entry.
    ///
    /// Shard directories are created as needed; creating an existing
    /// directory is not an error, so concurrent writers to the same shard
    /// are fine. The file itself is overwritten in place.
    pub async fn put(&self, url: &str, data: &[u8]) -> Result<CacheKey, CacheError> {
        let key = key_for(url);
        let path = self.root.join(key.shard_path()?);

        if let Some(shard_dir) = path.parent() {
            tokio::fs::create_dir_all(shard_dir)
                .await
                .map_err(|e| CacheError::io(shard_dir, e))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| CacheError::io(&path, e))?;

        debug!(url = %url, key = %key, size = data.len(), "Cache write");
        Ok(key)
    }

    /// Remove the entry for `url`.
    ///
    /// With `prune_dirs`, the second level and then the top level shard
    /// directory are removed too. Both removals fail if the directory still
    /// holds other entries, which leaves sibling entries untouched.
    pub async fn delete(&self, url: &str, prune_dirs: bool) -> Result<(), CacheError> {
        let path = self.entry_path(url)?;

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| CacheError::io(&path, e))?;

        debug!(url = %url, path = %path.display(), "Cache entry removed");

        if !prune_dirs {
            return Ok(());
        }

        let mut dir = path.parent();
        for _ in 0..2 {
            let Some(shard_dir) = dir else { break };
            tokio::fs::remove_dir(shard_dir)
                .await
                .map_err(|e| CacheError::io(shard_dir, e))?;
            dir = shard_dir.parent();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (TempDir, ShardedCache) {
        let dir = TempDir::new().unwrap();
        let cache = ShardedCache::new(dir.path());
        (dir, cache)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (_dir, cache) = cache();

        let key = cache.put("any", &[42]).await.unwrap();
        assert_eq!(key, key_for("any"));

        let data = cache.get("any").await.unwrap();
        assert_eq!(data, b"*");
    }

    #[tokio::test]
    async fn test_put_layout() {
        let (dir, cache) = cache();

        cache.put("any", b"data").await.unwrap();

        // md5("any") = 100b8cad7cf2a56f6df78f171f97a1ec
        let expected = dir.path().join("1").join("00").join("8cad7cf2a56f6df78f171f97a1ec");
        assert!(expected.is_file());
        assert_eq!(cache.entry_path("any").unwrap(), expected);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_dir, cache) = cache();

        cache.put("any", b"first version").await.unwrap();
        cache.put("any", b"second").await.unwrap();

        assert_eq!(cache.get("any").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, cache) = cache();

        let err = cache.get("https://example.com/missing.png").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_with_dirs() {
        let (dir, cache) = cache();

        cache.put("any", &[42]).await.unwrap();
        cache.delete("any", true).await.unwrap();

        assert!(cache.get("any").await.unwrap_err().is_not_found());
        assert!(!dir.path().join("1").exists());
    }

    #[tokio::test]
    async fn test_delete_keeps_dirs() {
        let (dir, cache) = cache();

        cache.put("any", &[42]).await.unwrap();
        cache.delete("any", false).await.unwrap();

        assert!(cache.get("any").await.unwrap_err().is_not_found());
        assert!(dir.path().join("1").join("00").is_dir());
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let (_dir, cache) = cache();

        let err = cache.delete("never stored", true).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_refuses_to_prune_shared_shard() {
        let (_dir, cache) = cache();

        cache.put("any", &[1]).await.unwrap();
        // plant a sibling in the same second level shard
        let sibling = cache.entry_path("any").unwrap().with_file_name("sibling");
        std::fs::write(&sibling, [2]).unwrap();

        let err = cache.delete("any", true).await.unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert!(sibling.is_file());
        assert!(cache.get("any").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_put_fails_when_shard_is_a_file() {
        let (dir, cache) = cache();

        // "1" is the top level shard of md5("any")
        std::fs::write(dir.path().join("1"), b"in the way").unwrap();

        let err = cache.put("any", &[42]).await.unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }
}
