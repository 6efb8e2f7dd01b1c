//! Naming conventions applied during file-set resolution.

use std::path::Path;

/// Context shared by every convention invocation.
pub struct ConventionContext<'a> {
    /// Root directory that relative asset paths resolve against.
    pub source_root: &'a Path,
}

/// A naming convention that may rewrite a file's semantic path before it
/// proceeds to batching and processing.
pub trait FileConvention: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return `Some(rewritten)` to substitute the path, `None` to keep it.
    fn apply(&self, path: &str, ctx: &ConventionContext<'_>) -> Option<String>;
}

/// Prefer a pre-minified sibling: `js/app.js` becomes `js/app.min.js`
/// when that file exists, skipping the minifier's work for it.
pub struct MinifiedFilePathConvention;

impl FileConvention for MinifiedFilePathConvention {
    fn name(&self) -> &'static str {
        "prefer-minified"
    }

    fn apply(&self, path: &str, ctx: &ConventionContext<'_>) -> Option<String> {
        let (stem, ext) = path.rsplit_once('.')?;
        // Already a .min file
        if stem.ends_with(".min") {
            return None;
        }
        let candidate = format!("{stem}.min.{ext}");
        if ctx.source_root.join(&candidate).is_file() {
            Some(candidate)
        } else {
            None
        }
    }
}
