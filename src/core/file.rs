//! File identity types.
//!
//! A `WebFile` is the declared identity of one asset: a semantic path
//! (relative to the configured source root, or an external URL), a type,
//! a declared priority and optional dependencies. Immutable once declared.

use serde::Deserialize;

/// Kind of web asset, implied by extension at declaration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebFileType {
    Script,
    Style,
}

impl WebFileType {
    /// File extension including the leading dot.
    #[inline]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Script => ".js",
            Self::Style => ".css",
        }
    }

    /// MIME type for delivery responses.
    #[inline]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Script => "application/javascript",
            Self::Style => "text/css",
        }
    }

    /// Parse a URL type tag, case-insensitive. `js`/`script` and
    /// `css`/`style` are accepted; anything else is unknown.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "js" | "script" => Some(Self::Script),
            "css" | "style" => Some(Self::Style),
            _ => None,
        }
    }
}

/// Default declaration priority: after all explicitly prioritized files,
/// ties broken by declaration sequence.
pub const DEFAULT_ORDER: i32 = i32::MAX;

/// Declared identity of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebFile {
    /// Semantic path. Relative paths resolve against the source root;
    /// absolute `http(s)://` or protocol-relative `//` paths are external.
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: WebFileType,
    /// Declared priority; lower sorts earlier. Ties keep declaration order.
    #[serde(default = "default_order")]
    pub order: i32,
    /// Paths that must be emitted before this file.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_order() -> i32 {
    DEFAULT_ORDER
}

impl WebFile {
    pub fn new(path: impl Into<String>, file_type: WebFileType) -> Self {
        Self {
            path: path.into(),
            file_type,
            order: DEFAULT_ORDER,
            dependencies: Vec::new(),
        }
    }

    pub fn script(path: impl Into<String>) -> Self {
        Self::new(path, WebFileType::Script)
    }

    pub fn style(path: impl Into<String>) -> Self {
        Self::new(path, WebFileType::Style)
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the path points at a foreign origin.
    pub fn is_external(&self) -> bool {
        let p = self.path.as_str();
        p.starts_with("http://") || p.starts_with("https://") || p.starts_with("//")
    }
}

/// A `WebFile` paired with its post-resolution identity hash.
///
/// Recomputed per render request: the hash covers the resolved path after
/// convention substitution, so a path rewrite produces a fresh identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedWebFile {
    pub file: WebFile,
    /// Short digest of the resolved path; the file's cache identity.
    pub hash: String,
}

impl HashedWebFile {
    pub fn new(file: WebFile) -> Self {
        let hash = crate::hash::fingerprint(&file.path);
        Self { file, hash }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.file.path
    }
}
