//! Hashing for cache keys, URL keys and source freshness.
//!
//! Two hashers with different jobs:
//! - `fingerprint` produces the short deterministic digest used for
//!   composite-URL keys, cache keys and ETags (`FxHasher`, stable across
//!   process restarts for the same input).
//! - `ContentHash` is a blake3 digest of file contents, used to decide
//!   whether a cached artifact is still valid for its source.

use std::hash::Hasher;
use std::path::Path;

use rustc_hash::FxHasher;

/// Compute 64-bit hash from byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// Compute hash and return as 8-char hex fingerprint.
///
/// Used for cache-busting keys (e.g. `a1b2c3d4.css`).
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    format!("{:016x}", compute(value))[..8].to_string()
}

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a hash representing "no content" (all zeros).
    #[inline]
    pub const fn empty() -> Self {
        Self([0; 32])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 32]
    }

    /// Convert to hex string.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Compute blake3 hash of a string.
pub fn content_hash(data: &[u8]) -> ContentHash {
    ContentHash::new(*blake3::hash(data).as_bytes())
}

/// Compute blake3 hash of file contents.
///
/// Returns the empty hash when the file cannot be read.
pub fn file_content_hash(path: &Path) -> ContentHash {
    match std::fs::read(path) {
        Ok(bytes) => content_hash(&bytes),
        Err(_) => ContentHash::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("test1.test2.test3");
        let b = fingerprint("test1.test2.test3");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn test_fingerprint_distinct_inputs() {
        assert_ne!(fingerprint("a.b"), fingerprint("a.c"));
    }

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
    }

    #[test]
    fn test_content_hash_hex_roundtrip() {
        let original = ContentHash::new([0x12; 32]);
        let recovered = ContentHash::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, recovered);
    }

    #[test]
    fn test_file_content_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.js");
        fs::write(&path, "var x = 1;").unwrap();

        let hash1 = file_content_hash(&path);
        let hash2 = file_content_hash(&path);
        assert_eq!(hash1, hash2);
        assert!(!hash1.is_empty());

        fs::write(&path, "var x = 2;").unwrap();
        assert_ne!(hash1, file_content_hash(&path));
    }

    #[test]
    fn test_file_content_hash_nonexistent() {
        assert!(file_content_hash(Path::new("/nonexistent/file.js")).is_empty());
    }
}
