//! Core data model: file identities, bundles and cache-busting tokens.

mod file;

pub use file::{HashedWebFile, WebFile, WebFileType};

use serde::Deserialize;

/// Opaque version token appended to every generated URL.
///
/// Supplied by the embedding application (deploy stamp, config hash, ...);
/// the engine never computes it. Changing the value invalidates every
/// generated URL and cached artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBuster(String);

impl CacheBuster {
    /// Create a cache buster from a non-empty token.
    ///
    /// Panics on an empty token: a missing cache buster is embedding-
    /// application misuse, not a runtime condition.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        assert!(!token.is_empty(), "cache buster token must not be empty");
        Self(token)
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Client caching directives attached to a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheControlOptions {
    /// Emit an ETag for delivery responses.
    pub enable_etag: bool,
    /// `Cache-Control: max-age` in seconds; zero disables the header.
    pub cache_control_max_age_seconds: u64,
}

impl Default for CacheControlOptions {
    fn default() -> Self {
        // 10 days, matching the default delivery expiry policy
        Self {
            enable_etag: true,
            cache_control_max_age_seconds: 10 * 24 * 60 * 60,
        }
    }
}

/// Per-bundle options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleOptions {
    pub cache_control: CacheControlOptions,
    /// Override the default pipeline with an explicit ordered list of
    /// processor names. `None` means the factory default for the file type.
    pub pipeline: Option<Vec<String>>,
}

/// Cache header values the transport layer should apply to a delivery
/// response. Computed by the engine, applied by the embedding server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    /// ETag value, when enabled for the bundle.
    pub etag: Option<String>,
    /// `max-age` seconds; zero means no caching headers.
    pub max_age_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_buster_value() {
        let buster = CacheBuster::new("abc123");
        assert_eq!(buster.value(), "abc123");
        assert_eq!(buster.len(), 6);
    }

    #[test]
    #[should_panic(expected = "cache buster token must not be empty")]
    fn test_cache_buster_empty_panics() {
        CacheBuster::new("");
    }

    #[test]
    fn test_cache_control_defaults() {
        let opts = CacheControlOptions::default();
        assert!(opts.enable_etag);
        assert_eq!(opts.cache_control_max_age_seconds, 864_000);
    }

    #[test]
    fn test_bundle_options_from_toml() {
        let opts: BundleOptions = toml::from_str(
            r#"
            pipeline = ["css-minifier"]
            [cache_control]
            enable_etag = false
            cache_control_max_age_seconds = 60
            "#,
        )
        .unwrap();
        assert_eq!(opts.pipeline.as_deref(), Some(&["css-minifier".to_string()][..]));
        assert!(!opts.cache_control.enable_etag);
        assert_eq!(opts.cache_control.cache_control_max_age_seconds, 60);
    }
}
