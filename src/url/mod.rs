//! The addressing layer.
//!
//! Encodes a bundle or an ordered batch of hashed files into delivery
//! URLs bounded by `max_url_length`, and decodes an incoming delivery
//! path back into its structural parts.
//!
//! URL shapes:
//! - bundle:    `/<bundle_path>/<escaped-name><ext>.<v|d><buster>`
//! - composite: `/<composite_path>/<escaped-key><ext>.v<buster>`
//!
//! Internal representation stays decoded; escaping happens only when a
//! URL string is rendered (browser boundary).

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::config::SmeltOptions;
use crate::core::{CacheBuster, HashedWebFile, WebFileType};
use crate::error::{Result, SmeltError};
use crate::hash;

/// Fixed margin covering the leading `/`, path separators and the mode
/// character when projecting a composite URL's final length.
const URL_SLACK: usize = 10;

/// Characters escaped when a name is rendered into a URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'/');

/// One encoded composite unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSetUrl {
    /// Batch identity: fingerprint of the delimited name list. Opaque to
    /// clients; the engine maps it back to cached content.
    pub key: String,
    /// Delivery URL for this unit.
    pub url: String,
    /// Extension-stripped names covered by this unit, in input order.
    pub names: Vec<String>,
}

/// Decoded form of an incoming delivery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrlPath {
    /// Ordered name fragments (everything left of the type tag).
    pub names: Vec<String>,
    pub file_type: WebFileType,
    /// Cache-buster token the URL was generated with.
    pub version: String,
    pub debug: bool,
}

/// Encodes and decodes delivery URLs. Pure string work, no I/O.
#[derive(Debug, Clone)]
pub struct UrlManager {
    options: SmeltOptions,
}

impl UrlManager {
    pub fn new(options: SmeltOptions) -> Self {
        Self { options }
    }

    /// Build the URL for a whole named bundle.
    ///
    /// Deterministic in its inputs: path template + escaped bundle name +
    /// extension + mode flag (`d` debug, `v` otherwise) + cache buster.
    pub fn bundle_url(
        &self,
        bundle_name: &str,
        extension: &str,
        debug: bool,
        cache_buster: &CacheBuster,
    ) -> String {
        format!(
            "/{}/{}{}.{}{}",
            self.options.bundle_file_path,
            utf8_percent_encode(bundle_name, SEGMENT),
            extension,
            if debug { 'd' } else { 'v' },
            cache_buster.value()
        )
    }

    /// Encode an ordered batch of files into one or more composite URLs.
    ///
    /// Walks the batch in order, accumulating extension-stripped,
    /// delimiter-terminated names. When the projected URL length would
    /// meet or exceed `max_url_length`, the buffer is flushed as one
    /// `FileSetUrl` and the current file is re-attempted against a fresh
    /// buffer. A file that cannot fit even alone is a deployment error.
    ///
    /// The same input and the same options always produce the same split
    /// points; concatenating `names` across the result restores the input
    /// order exactly.
    pub fn composite_urls(
        &self,
        files: &[HashedWebFile],
        extension: &str,
        cache_buster: &CacheBuster,
    ) -> Result<Vec<FileSetUrl>> {
        let reserved = self.options.composite_file_path.len()
            + extension.len()
            + cache_buster.len()
            + URL_SLACK;

        let mut out = Vec::new();
        let mut buffer = String::new();
        let mut names: Vec<String> = Vec::new();

        let mut i = 0;
        while i < files.len() {
            let stripped = trim_extension(files[i].path(), extension);

            // Projected buffer length if this name were appended with its
            // trailing delimiter.
            let projected = buffer.len() + stripped.len() + 1;
            if projected + reserved >= self.options.max_url_length {
                if buffer.is_empty() {
                    // First file alone exceeds the limit; dropping or
                    // truncating a dependency is never acceptable.
                    return Err(SmeltError::PathTooLong {
                        path: stripped.to_string(),
                        limit: self.options.max_url_length,
                    });
                }
                out.push(self.flush(&mut buffer, &mut names, extension, cache_buster));
                // same file re-attempted against the fresh buffer
            } else {
                buffer.push_str(&stripped);
                buffer.push('.');
                names.push(stripped.into_owned());
                i += 1;
            }
        }

        if !buffer.is_empty() {
            out.push(self.flush(&mut buffer, &mut names, extension, cache_buster));
        }

        Ok(out)
    }

    /// Decode a delivery path. Malformed input from untrusted clients
    /// yields `None`, never a panic or error.
    pub fn parse_path(&self, input: &str) -> Option<ParsedUrlPath> {
        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() < 3 {
            return None;
        }

        let last = parts[parts.len() - 1];
        let debug = match last.chars().next() {
            Some('v') => false,
            Some('d') => true,
            _ => return None,
        };
        let version = last[1..].to_string();

        let file_type = WebFileType::parse_tag(parts[parts.len() - 2])?;

        let names = parts[..parts.len() - 2]
            .iter()
            .map(|s| (*s).to_string())
            .collect();

        Some(ParsedUrlPath {
            names,
            file_type,
            version,
            debug,
        })
    }

    /// Drain the buffer into one `FileSetUrl`.
    fn flush(
        &self,
        buffer: &mut String,
        names: &mut Vec<String>,
        extension: &str,
        cache_buster: &CacheBuster,
    ) -> FileSetUrl {
        let output = buffer.trim_end_matches('.');
        let key = hash::fingerprint(output);
        let url = format!(
            "/{}/{}{}.v{}",
            self.options.composite_file_path,
            utf8_percent_encode(&key, SEGMENT),
            extension,
            cache_buster.value()
        );
        buffer.clear();
        FileSetUrl {
            key,
            url,
            names: std::mem::take(names),
        }
    }
}

/// Strip a trailing extension (case-insensitive) from a path.
fn trim_extension<'a>(path: &'a str, extension: &str) -> std::borrow::Cow<'a, str> {
    if path.len() >= extension.len()
        && path[path.len() - extension.len()..].eq_ignore_ascii_case(extension)
    {
        std::borrow::Cow::Borrowed(&path[..path.len() - extension.len()])
    } else {
        std::borrow::Cow::Borrowed(path)
    }
}
