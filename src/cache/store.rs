//! Key → blob cache storage.
//!
//! Writes are atomic with respect to concurrent readers: content lands
//! in a temporary file first and is published with a rename, so a reader
//! never observes a partially written artifact.

use std::path::PathBuf;

use crate::error::{Result, SmeltError};
use crate::pipeline::BoxFuture;

/// Storage interface for cached processed output.
///
/// Keys are short fingerprint strings and double as file names; callers
/// never hand untrusted input here.
pub trait CacheStore: Send + Sync {
    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool>;
    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
    /// Atomic publish: readers see the old blob or the new one, nothing
    /// in between.
    fn write<'a>(&'a self, key: &'a str, content: &'a [u8]) -> BoxFuture<'a, Result<()>>;
    fn invalidate<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Filesystem-backed store rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    cache_dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Blob location for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.cache_dir.join(key)
    }

    async fn write_atomic(&self, key: &str, content: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| SmeltError::io(&self.cache_dir, e))?;

        let target = self.path_for(key);
        let tmp = self.cache_dir.join(format!("{key}.tmp"));
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| SmeltError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| SmeltError::io(&target, e))?;
        Ok(())
    }
}

impl CacheStore for FileCacheStore {
    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            tokio::fs::try_exists(self.path_for(key))
                .await
                .unwrap_or(false)
        })
    }

    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let path = self.path_for(key);
            tokio::fs::read(&path)
                .await
                .map_err(|e| SmeltError::io(path, e))
        })
    }

    fn write<'a>(&'a self, key: &'a str, content: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write_atomic(key, content))
    }

    fn invalidate<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = self.path_for(key);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(SmeltError::io(path, e)),
            }
        })
    }
}
