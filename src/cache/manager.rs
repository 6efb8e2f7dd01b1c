//! Drives a pipeline over a file and caches the transformed output.
//!
//! Guarantees:
//! - idempotent reuse: a key whose stored metadata still matches the
//!   source content hash and cache buster is returned without invoking a
//!   single stage;
//! - single-flight per key: concurrent requests for the same uncached
//!   key share one pipeline execution through a per-key in-flight
//!   channel;
//! - the shared run lives in its own task and publishes its outcome
//!   through the channel, so it completes even if every requester,
//!   including the one that started it, is abandoned mid-await;
//! - a failed attempt leaves the key uncached and retryable.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::SmeltOptions;
use crate::core::{CacheBuster, HashedWebFile};
use crate::error::{Result, SmeltError};
use crate::hash;
use crate::pipeline::{FileProcessContext, PreProcessPipeline};

use super::CacheStore;

/// Validity metadata stored next to each artifact.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct CacheEntryMeta {
    source_hash: String,
    cache_buster: String,
}

/// `None` while the run is in flight, `Some` once it has published.
type Outcome = Option<Result<String>>;

pub struct PreProcessManager {
    options: Arc<SmeltOptions>,
    store: Arc<dyn CacheStore>,
    in_flight: Arc<DashMap<String, watch::Receiver<Outcome>>>,
}

impl PreProcessManager {
    pub fn new(options: Arc<SmeltOptions>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            options,
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Cache key for a file under a given pipeline and cache epoch.
    ///
    /// Built from the file's resolved-path hash, the stage sequence and
    /// the cache buster, so a pipeline override never shares output with
    /// the default pipeline and a cache-buster change starts a fresh
    /// epoch.
    pub fn cache_key(
        &self,
        file: &HashedWebFile,
        pipeline: &PreProcessPipeline,
        cache_buster: &CacheBuster,
    ) -> String {
        hash::fingerprint(&format!(
            "{}|{}|{}",
            file.hash,
            pipeline.identity(),
            cache_buster.value()
        ))
    }

    /// Process a file through a pipeline and persist the output,
    /// returning the cache key the artifact is stored under.
    pub async fn process_and_cache(
        &self,
        file: &HashedWebFile,
        pipeline: &PreProcessPipeline,
        cache_buster: &CacheBuster,
    ) -> Result<String> {
        let key = self.cache_key(file, pipeline, cache_buster);

        if self.is_cached(&key, file, cache_buster).await {
            crate::debug!("cache"; "hit for `{}` ({key})", file.path());
            return Ok(key);
        }

        // Start the shared run or join one already in flight. entry()
        // holds the shard lock, so exactly one requester spawns.
        let mut rx = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(None);
                slot.insert(rx.clone());

                let in_flight = self.in_flight.clone();
                let options = self.options.clone();
                let store = self.store.clone();
                let file = file.clone();
                let pipeline = pipeline.clone();
                let cache_buster = cache_buster.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    let result =
                        run_and_persist(options, store, file, pipeline, cache_buster, key.clone())
                            .await;
                    // Removed before publishing so a failure is retried
                    // with a fresh run, not replayed from the channel.
                    in_flight.remove(&key);
                    let _ = tx.send(Some(result));
                });
                rx
            }
        };

        let outcome = match rx.wait_for(|v| v.is_some()).await {
            Ok(value) => value.clone(),
            Err(_) => {
                // The producing task died without publishing.
                self.in_flight.remove(&key);
                return Err(SmeltError::Task(format!(
                    "processing of `{key}` ended without a result"
                )));
            }
        };
        outcome.unwrap_or_else(|| unreachable!("waited for a published value"))
    }

    /// Drop a cached artifact and its metadata.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.store.invalidate(&meta_key(key)).await?;
        self.store.invalidate(key).await
    }

    /// Read a cached artifact.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.store.read(key).await
    }

    /// Whether `key` holds valid output for the file's current content.
    async fn is_cached(&self, key: &str, file: &HashedWebFile, cache_buster: &CacheBuster) -> bool {
        if !self.store.exists(key).await {
            return false;
        }
        let Ok(raw) = self.store.read(&meta_key(key)).await else {
            return false;
        };
        let Ok(meta) = serde_json::from_slice::<CacheEntryMeta>(&raw) else {
            return false;
        };
        let source = self.options.source_root.join(file.path());
        let current = hash::file_content_hash(&source);
        !current.is_empty()
            && meta.source_hash == current.to_hex()
            && meta.cache_buster == cache_buster.value()
    }
}

/// Run the pipeline over the file and atomically publish artifact and
/// metadata. Free function so the spawned task owns everything it needs.
async fn run_and_persist(
    options: Arc<SmeltOptions>,
    store: Arc<dyn CacheStore>,
    file: HashedWebFile,
    pipeline: PreProcessPipeline,
    cache_buster: CacheBuster,
    key: String,
) -> Result<String> {
    let source_path = options.source_root.join(file.path());
    let content = tokio::fs::read_to_string(&source_path)
        .await
        .map_err(|e| SmeltError::io(&source_path, e))?;

    let source_hash = hash::content_hash(content.as_bytes()).to_hex();

    let ctx = FileProcessContext {
        file: &file.file,
        source_path,
        options: &options,
    };
    let output = pipeline.process(content, &ctx).await?;

    store.write(&key, output.as_bytes()).await?;
    let meta = CacheEntryMeta {
        source_hash,
        cache_buster: cache_buster.value().to_string(),
    };
    // unwrap: struct of two strings always serializes
    let raw = serde_json::to_vec(&meta).unwrap();
    store.write(&meta_key(&key), &raw).await?;

    crate::debug!("process"; "cached `{}` as {key} ({})", file.path(), pipeline.identity());
    Ok(key)
}

fn meta_key(key: &str) -> String {
    format!("{key}.meta")
}
