//! Partitioning an ordered file list into composite units.
//!
//! Contiguous runs of local files share a batch; an externally hosted
//! file is always a singleton batch so it is delivered from its own
//! origin untouched. Batch order equals input order. URL-length limits
//! are not enforced here; the addressing layer splits oversized batches.

use crate::core::{HashedWebFile, WebFile};

/// An ordered group of files emitted as one composite unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebFileBatch {
    files: Vec<HashedWebFile>,
    is_external: bool,
}

impl WebFileBatch {
    fn local(files: Vec<HashedWebFile>) -> Self {
        Self {
            files,
            is_external: false,
        }
    }

    fn external(file: HashedWebFile) -> Self {
        Self {
            files: vec![file],
            is_external: true,
        }
    }

    /// An external batch contains exactly one file.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    #[inline]
    pub fn files(&self) -> &[HashedWebFile] {
        &self.files
    }

    /// The single file of an external batch.
    ///
    /// Panics when called on a local batch; callers branch on
    /// `is_external` first.
    pub fn single(&self) -> &HashedWebFile {
        debug_assert!(self.is_external);
        &self.files[0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Partition ordered files into batches for composite-URL generation.
pub fn batch_files(ordered: Vec<WebFile>) -> Vec<WebFileBatch> {
    let mut batches = Vec::new();
    let mut current: Vec<HashedWebFile> = Vec::new();

    for file in ordered {
        if file.is_external() {
            if !current.is_empty() {
                batches.push(WebFileBatch::local(std::mem::take(&mut current)));
            }
            batches.push(WebFileBatch::external(HashedWebFile::new(file)));
        } else {
            current.push(HashedWebFile::new(file));
        }
    }

    if !current.is_empty() {
        batches.push(WebFileBatch::local(current));
    }

    batches
}
