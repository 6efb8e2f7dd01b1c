//! CSS `@import` inlining stage.
//!
//! Replaces local `@import` statements with the imported file's content
//! so a composite stylesheet does not fan out into extra requests.
//! External imports stay untouched, and inlining is one level deep per
//! pass — an inlined file's own imports are served as written.

use std::sync::LazyLock;

use regex::Regex;

use super::{BoxFuture, FileProcessContext, PreProcessor};
use crate::error::Result;

pub const CSS_IMPORT: &str = "css-import";

/// `@import url("x.css");` and `@import "x.css";` forms.
static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    // unwrap: pattern is a compile-time constant
    Regex::new(r#"@import\s+(?:url\(\s*)?["']?([^"')\s;]+)["']?\s*\)?\s*;"#).unwrap()
});

pub struct CssImportProcessor;

impl CssImportProcessor {
    async fn inline(&self, content: &str, ctx: &FileProcessContext<'_>) -> String {
        // Collect matches first; the replacement text comes from disk.
        let matches: Vec<(std::ops::Range<usize>, String)> = IMPORT
            .captures_iter(content)
            .map(|caps| {
                let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
                (whole, caps[1].to_string())
            })
            .collect();

        if matches.is_empty() {
            return content.to_string();
        }

        let css_dir = ctx.source_path.parent().map(std::path::Path::to_path_buf);

        let mut out = String::with_capacity(content.len());
        let mut cursor = 0;
        for (range, target) in matches {
            out.push_str(&content[cursor..range.start]);
            cursor = range.end;

            let inlined = if is_external(&target) {
                None
            } else {
                match &css_dir {
                    Some(dir) => tokio::fs::read_to_string(dir.join(&target)).await.ok(),
                    None => None,
                }
            };

            match inlined {
                Some(imported) => out.push_str(&imported),
                // External or unreadable: keep the statement as written.
                None => out.push_str(&content[range.clone()]),
            }
        }
        out.push_str(&content[cursor..]);
        out
    }
}

fn is_external(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

impl PreProcessor for CssImportProcessor {
    fn name(&self) -> &'static str {
        CSS_IMPORT
    }

    fn process<'a>(
        &'a self,
        content: String,
        ctx: &'a FileProcessContext<'a>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Ok(self.inline(&content, ctx).await) })
    }
}
