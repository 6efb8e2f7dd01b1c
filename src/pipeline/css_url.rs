//! CSS `url()` rewriting stage.
//!
//! Rewrites relative asset references (image paths and the like) to
//! site-absolute ones so they stay valid when the stylesheet is served
//! from a composite URL at a different path depth. Absolute and
//! protocol-relative targets are left alone; fragments survive the
//! rewrite.

use regex::{Captures, Regex};
use url::Url;

use super::{BoxFuture, FileProcessContext, PreProcessor};
use crate::error::Result;

pub const CSS_URL: &str = "css-url";

pub struct CssUrlProcessor {
    url_ref: Regex,
}

impl CssUrlProcessor {
    pub fn new() -> Self {
        Self {
            // unwrap: pattern is a compile-time constant
            url_ref: Regex::new(r#"url\(\s*([^)]+?)\s*\)"#).unwrap(),
        }
    }

    /// Rewrite every relative `url()` against the stylesheet's location.
    fn rewrite(&self, content: &str, css_location: &Url) -> String {
        self.url_ref
            .replace_all(content, |caps: &Captures<'_>| {
                let target = caps[1].trim_matches(['\'', '"']);
                if is_absolute(target) {
                    return format!("url(\"{target}\")");
                }
                let (path, fragment) = match target.split_once('#') {
                    Some((p, f)) => (p, Some(f)),
                    None => (target, None),
                };
                let Ok(joined) = css_location.join(path) else {
                    return caps[0].to_string();
                };
                let mut absolute = joined.path().to_string();
                if let Some(query) = joined.query() {
                    absolute.push('?');
                    absolute.push_str(query);
                }
                if let Some(fragment) = fragment {
                    absolute.push('#');
                    absolute.push_str(fragment);
                }
                format!("url(\"{absolute}\")")
            })
            .into_owned()
    }
}

impl Default for CssUrlProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Targets that must not be resolved against the stylesheet location.
fn is_absolute(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("data:")
}

impl PreProcessor for CssUrlProcessor {
    fn name(&self) -> &'static str {
        CSS_URL
    }

    fn process<'a>(
        &'a self,
        content: String,
        ctx: &'a FileProcessContext<'a>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let base = Url::parse(&ctx.options.base_url)
                .map_err(|e| ctx.stage_error(CSS_URL, format!("invalid base_url: {e}")))?;
            let css_location = base
                .join(&ctx.file.path)
                .map_err(|e| ctx.stage_error(CSS_URL, format!("unresolvable css path: {e}")))?;
            Ok(self.rewrite(&content, &css_location))
        })
    }
}
