//! Engine options.
//!
//! Deserializable from TOML so the embedding application can ship the
//! engine section inside its own config file, with validated defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::SmeltError;

/// Default maximum URL length, matching common proxy/browser limits.
pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;

/// Options for the bundling engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmeltOptions {
    /// Root directory that relative asset paths resolve against.
    pub source_root: PathBuf,
    /// Directory for cached processed output.
    pub cache_dir: PathBuf,
    /// Base path segment for per-bundle URLs (`sb` → `/sb/...`).
    pub bundle_file_path: String,
    /// Base path segment for composite URLs (`sc` → `/sc/...`).
    pub composite_file_path: String,
    /// Hard limit on generated composite URL length.
    pub max_url_length: usize,
    /// Site base URL; relative `url()` references in CSS are rewritten
    /// against it.
    pub base_url: String,
}

impl Default for SmeltOptions {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            cache_dir: PathBuf::from(".smelt-cache"),
            bundle_file_path: "sb".to_string(),
            composite_file_path: "sc".to_string(),
            max_url_length: DEFAULT_MAX_URL_LENGTH,
            base_url: "http://localhost/".to_string(),
        }
    }
}

impl SmeltOptions {
    /// Load options from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine options from `{}`", path.display()))?;
        Ok(Self::from_toml(&raw)?)
    }

    /// Parse options from a TOML string.
    pub fn from_toml(input: &str) -> Result<Self, SmeltError> {
        let options: Self =
            toml::from_str(input).map_err(|e| SmeltError::Options(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Check option coherence. Misconfiguration here is embedding-
    /// application misuse and fails hard before any request is served.
    pub fn validate(&self) -> Result<(), SmeltError> {
        if self.max_url_length == 0 {
            return Err(SmeltError::Options("max_url_length must be non-zero".into()));
        }
        // The split algorithm reserves prefix + extension + buster + slack;
        // a limit smaller than that can never fit a single file.
        let reserved = self.composite_file_path.len() + ".css".len() + 10;
        if self.max_url_length <= reserved {
            return Err(SmeltError::Options(format!(
                "max_url_length ({}) leaves no room for file names (reserved {})",
                self.max_url_length, reserved
            )));
        }
        if self.bundle_file_path.is_empty() || self.composite_file_path.is_empty() {
            return Err(SmeltError::Options(
                "bundle_file_path and composite_file_path must be non-empty".into(),
            ));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(SmeltError::Options(format!(
                "base_url `{}` is not an absolute URL",
                self.base_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        SmeltOptions::default().validate().unwrap();
    }

    #[test]
    fn test_from_toml() {
        let options = SmeltOptions::from_toml(
            r#"
            source_root = "wwwroot"
            cache_dir = "/tmp/smelt"
            max_url_length = 1024
            base_url = "https://example.com/"
            "#,
        )
        .unwrap();
        assert_eq!(options.max_url_length, 1024);
        assert_eq!(options.bundle_file_path, "sb");
        assert_eq!(options.source_root, PathBuf::from("wwwroot"));
    }

    #[test]
    fn test_rejects_zero_url_length() {
        let mut options = SmeltOptions::default();
        options.max_url_length = 0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_rejects_unusable_url_length() {
        let mut options = SmeltOptions::default();
        options.max_url_length = 12;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_base_url() {
        let mut options = SmeltOptions::default();
        options.base_url = "/assets/".to_string();
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("smelt.toml");
        std::fs::write(&path, "max_url_length = 512").unwrap();
        let options = SmeltOptions::load(&path).unwrap();
        assert_eq!(options.max_url_length, 512);

        assert!(SmeltOptions::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_rejects_unknown_field() {
        assert!(SmeltOptions::from_toml("max_handler_url = 10").is_err());
    }
}
