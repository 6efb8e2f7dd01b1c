//! Bundle registry.
//!
//! Maps bundle name to its declared files and options. Bundles are
//! write-once: the first `create` for a name wins, later creates are
//! no-ops reported as `AlreadyExists` — never an error, never a merge.
//! The registry is owned and injected (constructed once at startup),
//! safe for many concurrent readers and rare writers.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::core::{BundleOptions, WebFile, WebFileType};
use crate::error::SmeltError;

/// A named, ordered collection of declared files plus delivery options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub file_type: WebFileType,
    pub files: Vec<WebFile>,
    pub options: BundleOptions,
}

impl Bundle {
    /// File extension for this bundle's delivery URL.
    #[inline]
    pub fn extension(&self) -> &'static str {
        self.file_type.extension()
    }
}

/// Outcome of a bundle creation attempt.
///
/// Both variants hand back the registered bundle; `AlreadyExists` means
/// the caller's files were *not* registered.
#[derive(Debug, Clone)]
pub enum CreateResult {
    Inserted(Arc<Bundle>),
    AlreadyExists(Arc<Bundle>),
}

impl CreateResult {
    /// The bundle stored in the registry, whichever creation won.
    pub fn bundle(&self) -> &Arc<Bundle> {
        match self {
            Self::Inserted(b) | Self::AlreadyExists(b) => b,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Registry of statically and dynamically declared bundles.
#[derive(Debug, Default)]
pub struct BundleManager {
    bundles: DashMap<String, Arc<Bundle>>,
}

impl BundleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-if-absent bundle creation.
    ///
    /// Panics on an empty name: that is embedding-application misuse.
    pub fn create(
        &self,
        name: &str,
        file_type: WebFileType,
        files: Vec<WebFile>,
        options: BundleOptions,
    ) -> CreateResult {
        assert!(!name.trim().is_empty(), "bundle name must not be empty");

        // entry() holds the shard lock, making first-create atomic under
        // racing writers.
        match self.bundles.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                crate::debug!("bundle"; "`{name}` already registered, create is a no-op");
                CreateResult::AlreadyExists(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                let bundle = Arc::new(Bundle {
                    name: name.to_string(),
                    file_type,
                    files,
                    options,
                });
                slot.insert(bundle.clone());
                crate::debug!("bundle"; "registered `{name}` ({} files)", bundle.files.len());
                CreateResult::Inserted(bundle)
            }
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    /// Look up a bundle, surfacing an unknown name as a distinct error
    /// rather than an empty bundle.
    pub fn get(&self, name: &str) -> Result<Arc<Bundle>, SmeltError> {
        self.bundles
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SmeltError::BundleNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
