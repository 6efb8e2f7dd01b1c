//! Request-level orchestration.
//!
//! Ties the layers together for an embedding server: bundle declaration,
//! URL generation for render requests, and delivery assembly for an
//! incoming URL. URL generation is pure string work; source files are
//! read and processed only when a delivery request arrives.
//!
//! Within one render request the URL set reflects a single ordering
//! resolution computed up front; nothing reorders mid-request.

use std::sync::Arc;

use dashmap::DashMap;

use crate::batch::batch_files;
use crate::bundle::{Bundle, BundleManager, CreateResult};
use crate::cache::{CacheStore, FileCacheStore, PreProcessManager};
use crate::config::SmeltOptions;
use crate::core::{
    BundleOptions, CacheBuster, CacheControlOptions, CacheHeaders, HashedWebFile, WebFile,
    WebFileType,
};
use crate::error::{Result, SmeltError};
use crate::hash;
use crate::order::{self, ConventionContext, FileConvention, MinifiedFilePathConvention};
use crate::pipeline::{PipelineFactory, PreProcessPipeline, PreProcessor};
use crate::url::{ParsedUrlPath, UrlManager};

/// A composite key's backing file set and the pipeline its artifact is
/// produced with. Registered at URL-generation time, consumed at delivery.
struct CompositeEntry {
    files: Vec<HashedWebFile>,
    pipeline: PreProcessPipeline,
}

/// Assembled delivery payload plus the caching directives the transport
/// should apply to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryContent {
    pub content: String,
    pub mime: &'static str,
    pub headers: CacheHeaders,
}

/// Per-request accumulator for dynamically required files.
///
/// A page render collects its script and style requirements as views
/// execute, then asks the engine for URLs once per file type.
#[derive(Debug, Default)]
pub struct RequestScope {
    scripts: Vec<WebFile>,
    styles: Vec<WebFile>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires_js(&mut self, path: impl Into<String>) -> &mut Self {
        self.scripts.push(WebFile::script(path));
        self
    }

    pub fn requires_css(&mut self, path: impl Into<String>) -> &mut Self {
        self.styles.push(WebFile::style(path));
        self
    }

    /// Register a fully specified file, routed by its type.
    pub fn requires(&mut self, file: WebFile) -> &mut Self {
        match file.file_type {
            WebFileType::Script => self.scripts.push(file),
            WebFileType::Style => self.styles.push(file),
        }
        self
    }

    pub fn files(&self, file_type: WebFileType) -> &[WebFile] {
        match file_type {
            WebFileType::Script => &self.scripts,
            WebFileType::Style => &self.styles,
        }
    }
}

/// The bundling engine. One instance per application, shared across
/// concurrent requests.
pub struct SmeltEngine {
    options: Arc<SmeltOptions>,
    bundles: BundleManager,
    urls: UrlManager,
    factory: PipelineFactory,
    processor: PreProcessManager,
    conventions: Vec<Box<dyn FileConvention>>,
    composites: DashMap<String, CompositeEntry>,
}

impl SmeltEngine {
    /// Build an engine over validated options with the standard processor
    /// set and the minified-sibling naming convention.
    pub fn new(options: SmeltOptions) -> Result<Self> {
        options.validate()?;
        let options = Arc::new(options);
        let store: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(&options.cache_dir));
        Ok(Self {
            urls: UrlManager::new((*options).clone()),
            processor: PreProcessManager::new(options.clone(), store),
            bundles: BundleManager::new(),
            factory: PipelineFactory::with_defaults(),
            conventions: vec![Box::new(MinifiedFilePathConvention)],
            composites: DashMap::new(),
            options,
        })
    }

    /// Add a naming convention after the built-in set. Call before the
    /// engine starts serving requests.
    pub fn register_convention(&mut self, convention: Box<dyn FileConvention>) {
        self.conventions.push(convention);
    }

    /// Register an application-defined processor, usable in bundle
    /// pipeline overrides and explicit pipelines by name.
    pub fn register_processor(&mut self, processor: Arc<dyn PreProcessor>) {
        self.factory.register(processor);
    }

    /// Declare a bundle. Write-once per name; see `BundleManager`.
    pub fn create_bundle(
        &self,
        name: &str,
        file_type: WebFileType,
        files: Vec<WebFile>,
        options: BundleOptions,
    ) -> CreateResult {
        self.bundles.create(name, file_type, files, options)
    }

    pub fn has_bundle(&self, name: &str) -> bool {
        self.bundles.exists(name)
    }

    /// Decode an incoming delivery path.
    pub fn parse_path(&self, input: &str) -> Option<ParsedUrlPath> {
        self.urls.parse_path(input)
    }

    /// URLs for a declared bundle.
    ///
    /// Debug mode lists the ordered source files individually, without
    /// convention substitution, so a browser sees the originals. Release
    /// mode yields the single bundle URL; content is produced when that
    /// URL is requested.
    pub fn urls_for_bundle(
        &self,
        name: &str,
        debug: bool,
        cache_buster: &CacheBuster,
    ) -> Result<Vec<String>> {
        let bundle = self.bundles.get(name)?;
        if debug {
            let ordered = self.resolve(bundle.files.clone(), true)?;
            return Ok(ordered.iter().map(source_url).collect());
        }
        Ok(vec![self.urls.bundle_url(
            name,
            bundle.extension(),
            false,
            cache_buster,
        )])
    }

    /// URLs for an ad-hoc ordered file set, e.g. a `RequestScope`'s
    /// accumulated requirements.
    ///
    /// External files pass through under their own origin; runs of local
    /// files become composite URLs, registered so a later delivery
    /// request can map each key back to its files and pipeline. `None`
    /// selects the default pipeline for the file type.
    pub fn urls_for_files(
        &self,
        files: Vec<WebFile>,
        file_type: WebFileType,
        pipeline: Option<PreProcessPipeline>,
        debug: bool,
        cache_buster: &CacheBuster,
    ) -> Result<Vec<String>> {
        if debug {
            let ordered = self.resolve(files, true)?;
            return Ok(ordered.iter().map(source_url).collect());
        }

        let ordered = self.resolve(files, false)?;
        let pipeline = pipeline.unwrap_or_else(|| self.factory.default_pipeline(file_type));

        let mut out = Vec::new();
        for batch in batch_files(ordered) {
            if batch.is_external() {
                out.push(batch.single().path().to_string());
                continue;
            }
            let sets =
                self.urls
                    .composite_urls(batch.files(), file_type.extension(), cache_buster)?;
            let mut covered = batch.files().iter();
            for set in sets {
                let files: Vec<HashedWebFile> =
                    covered.by_ref().take(set.names.len()).cloned().collect();
                crate::debug!("engine"; "composite {} covers {} file(s)", set.key, files.len());
                self.composites.insert(
                    set.key,
                    CompositeEntry {
                        files,
                        pipeline: pipeline.clone(),
                    },
                );
                out.push(set.url);
            }
        }
        Ok(out)
    }

    /// URLs for one file type of a request scope.
    pub fn urls_for_scope(
        &self,
        scope: &RequestScope,
        file_type: WebFileType,
        debug: bool,
        cache_buster: &CacheBuster,
    ) -> Result<Vec<String>> {
        self.urls_for_files(
            scope.files(file_type).to_vec(),
            file_type,
            None,
            debug,
            cache_buster,
        )
    }

    /// Assemble the artifact for a decoded composite URL.
    ///
    /// The key is looked up in the registry populated at URL-generation
    /// time; a key this engine never issued (stale client, restart) is a
    /// distinct error the transport answers with not-found.
    pub async fn composite_content(&self, parsed: &ParsedUrlPath) -> Result<DeliveryContent> {
        let key = parsed.names.join(".");
        if parsed.version.is_empty() {
            return Err(SmeltError::UnknownCompositeKey(key));
        }
        let (files, pipeline) = {
            let entry = self
                .composites
                .get(&key)
                .ok_or_else(|| SmeltError::UnknownCompositeKey(key.clone()))?;
            (entry.files.clone(), entry.pipeline.clone())
        };

        let cache_buster = CacheBuster::new(parsed.version.clone());
        let content = self
            .assemble(&files, &pipeline, &cache_buster)
            .await?;
        let mime = parsed.file_type.mime();
        Ok(DeliveryContent {
            content,
            mime,
            headers: cache_headers(&key, mime, &CacheControlOptions::default()),
        })
    }

    /// Assemble the artifact for a named bundle.
    pub async fn bundle_content(
        &self,
        name: &str,
        cache_buster: &CacheBuster,
    ) -> Result<DeliveryContent> {
        let bundle = self.bundles.get(name)?;
        let ordered: Vec<HashedWebFile> = self
            .resolve(bundle.files.clone(), false)?
            .into_iter()
            .map(HashedWebFile::new)
            .collect();
        let pipeline = self.pipeline_for(&bundle)?;
        let content = self.assemble(&ordered, &pipeline, cache_buster).await?;
        let mime = bundle.file_type.mime();
        Ok(DeliveryContent {
            content,
            mime,
            headers: cache_headers(name, mime, &bundle.options.cache_control),
        })
    }

    /// The pipeline a bundle's files are processed with: its declared
    /// override, or the factory default for its file type.
    fn pipeline_for(&self, bundle: &Bundle) -> Result<PreProcessPipeline> {
        match &bundle.options.pipeline {
            Some(names) => self.factory.pipeline(names),
            None => Ok(self.factory.default_pipeline(bundle.file_type)),
        }
    }

    /// Ordering + conventions over a declared set. Debug skips
    /// conventions so originals are served.
    fn resolve(&self, files: Vec<WebFile>, debug: bool) -> Result<Vec<WebFile>> {
        let ctx = ConventionContext {
            source_root: &self.options.source_root,
        };
        let conventions: &[Box<dyn FileConvention>] =
            if debug { &[] } else { &self.conventions };
        order::resolve(files, conventions, &ctx)
    }

    /// Process every local file through the pipeline (cache hits skip the
    /// work) and concatenate the cached outputs in order.
    async fn assemble(
        &self,
        files: &[HashedWebFile],
        pipeline: &PreProcessPipeline,
        cache_buster: &CacheBuster,
    ) -> Result<String> {
        let mut parts = Vec::with_capacity(files.len());
        for file in files {
            if file.file.is_external() {
                continue;
            }
            let key = self
                .processor
                .process_and_cache(file, pipeline, cache_buster)
                .await?;
            let raw = self.processor.read(&key).await?;
            parts.push(String::from_utf8_lossy(&raw).into_owned());
        }
        Ok(parts.join("\n"))
    }
}

/// Debug-mode URL for one source file: externals under their own origin,
/// locals rooted at the site.
fn source_url(file: &WebFile) -> String {
    if file.is_external() {
        file.path.clone()
    } else {
        format!("/{}", file.path)
    }
}

/// Cache directives for a delivery response. The ETag covers the content
/// identity and MIME type, stable across processes.
fn cache_headers(key: &str, mime: &str, options: &CacheControlOptions) -> CacheHeaders {
    CacheHeaders {
        etag: options
            .enable_etag
            .then(|| hash::fingerprint(&format!("{key}{mime}"))),
        max_age_seconds: options.cache_control_max_age_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BoxFuture, FileProcessContext, PreProcessor};
    use std::fs;
    use tempfile::TempDir;

    struct Upper;
    impl PreProcessor for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }
        fn process<'a>(
            &'a self,
            content: String,
            _ctx: &'a FileProcessContext<'a>,
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move { Ok(content.to_uppercase()) })
        }
    }

    fn engine(dir: &TempDir) -> SmeltEngine {
        let mut options = SmeltOptions::default();
        options.source_root = dir.path().to_path_buf();
        options.cache_dir = dir.path().join("cache");
        SmeltEngine::new(options).unwrap()
    }

    fn upper_pipeline() -> PreProcessPipeline {
        PreProcessPipeline::new(vec![Arc::new(Upper)])
    }

    #[test]
    fn test_unknown_bundle_fails() {
        let dir = TempDir::new().unwrap();
        let err = engine(&dir)
            .urls_for_bundle("missing", false, &CacheBuster::new("1"))
            .unwrap_err();
        assert!(matches!(err, SmeltError::BundleNotFound(name) if name == "missing"));
    }

    #[test]
    fn test_bundle_release_single_url() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        e.create_bundle(
            "site",
            WebFileType::Script,
            vec![WebFile::script("js/a.js"), WebFile::script("js/b.js")],
            BundleOptions::default(),
        );
        let urls = e
            .urls_for_bundle("site", false, &CacheBuster::new("1"))
            .unwrap();
        assert_eq!(urls, vec!["/sb/site.js.v1"]);
    }

    #[test]
    fn test_bundle_debug_lists_ordered_sources() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        e.create_bundle(
            "site",
            WebFileType::Script,
            vec![
                WebFile::script("js/app.js").with_dependencies(["js/lib.js"]),
                WebFile::script("js/lib.js"),
            ],
            BundleOptions::default(),
        );
        let urls = e
            .urls_for_bundle("site", true, &CacheBuster::new("1"))
            .unwrap();
        assert_eq!(urls, vec!["/js/lib.js", "/js/app.js"]);
    }

    #[test]
    fn test_debug_serves_originals_not_min_siblings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/app.js"), "x").unwrap();
        fs::write(dir.path().join("js/app.min.js"), "x").unwrap();

        let e = engine(&dir);
        e.create_bundle(
            "site",
            WebFileType::Script,
            vec![WebFile::script("js/app.js")],
            BundleOptions::default(),
        );
        let urls = e
            .urls_for_bundle("site", true, &CacheBuster::new("1"))
            .unwrap();
        assert_eq!(urls, vec!["/js/app.js"]);
    }

    #[test]
    fn test_external_files_pass_through() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let urls = e
            .urls_for_files(
                vec![
                    WebFile::script("js/a.js"),
                    WebFile::script("https://cdn.example.com/lib.js"),
                    WebFile::script("js/b.js"),
                ],
                WebFileType::Script,
                None,
                false,
                &CacheBuster::new("1"),
            )
            .unwrap();
        assert_eq!(urls.len(), 3);
        assert!(urls[0].starts_with("/sc/"));
        assert_eq!(urls[1], "https://cdn.example.com/lib.js");
        assert!(urls[2].starts_with("/sc/"));
    }

    #[test]
    fn test_scope_accumulates_by_type() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let mut scope = RequestScope::new();
        scope
            .requires_js("js/a.js")
            .requires_js("js/b.js")
            .requires_css("css/site.css");

        let js = e
            .urls_for_scope(&scope, WebFileType::Script, false, &CacheBuster::new("1"))
            .unwrap();
        let css = e
            .urls_for_scope(&scope, WebFileType::Style, false, &CacheBuster::new("1"))
            .unwrap();
        assert_eq!(js.len(), 1);
        assert!(js[0].ends_with(".js.v1"));
        assert_eq!(css.len(), 1);
        assert!(css[0].ends_with(".css.v1"));
    }

    #[tokio::test]
    async fn test_composite_delivery_round_trip() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/a.js"), "var x = 1;").unwrap();
        fs::write(dir.path().join("js/b.js"), "var y = 2;").unwrap();

        let e = engine(&dir);
        let urls = e
            .urls_for_files(
                vec![WebFile::script("js/a.js"), WebFile::script("js/b.js")],
                WebFileType::Script,
                Some(upper_pipeline()),
                false,
                &CacheBuster::new("1"),
            )
            .unwrap();
        assert_eq!(urls.len(), 1);

        let segment = urls[0].rsplit('/').next().unwrap();
        let parsed = e.parse_path(segment).unwrap();
        let delivered = e.composite_content(&parsed).await.unwrap();

        assert_eq!(delivered.content, "VAR X = 1;\nVAR Y = 2;");
        assert_eq!(delivered.mime, "application/javascript");
        assert!(delivered.headers.etag.is_some());
        assert_eq!(delivered.headers.max_age_seconds, 864_000);
    }

    #[tokio::test]
    async fn test_unknown_composite_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let parsed = e.parse_path("deadbeef.js.v1").unwrap();
        let err = e.composite_content(&parsed).await.unwrap_err();
        assert!(matches!(err, SmeltError::UnknownCompositeKey(key) if key == "deadbeef"));
    }

    #[tokio::test]
    async fn test_bundle_content_assembles_in_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/lib.js"), "lib").unwrap();
        fs::write(dir.path().join("js/app.js"), "app").unwrap();

        let mut e = engine(&dir);
        e.register_processor(Arc::new(Upper));
        e.create_bundle(
            "site",
            WebFileType::Script,
            vec![
                WebFile::script("js/app.js").with_dependencies(["js/lib.js"]),
                WebFile::script("js/lib.js"),
            ],
            BundleOptions {
                pipeline: Some(vec!["upper".to_string()]),
                ..Default::default()
            },
        );
        let delivered = e
            .bundle_content("site", &CacheBuster::new("1"))
            .await
            .unwrap();
        assert_eq!(delivered.content, "LIB\nAPP");
    }

    #[tokio::test]
    async fn test_bundle_cache_control_respected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.css"), "body { color: red; }").unwrap();

        let e = engine(&dir);
        e.create_bundle(
            "styles",
            WebFileType::Style,
            vec![WebFile::style("a.css")],
            BundleOptions {
                cache_control: CacheControlOptions {
                    enable_etag: false,
                    cache_control_max_age_seconds: 60,
                },
                pipeline: Some(vec!["css-minifier".to_string()]),
            },
        );
        let delivered = e
            .bundle_content("styles", &CacheBuster::new("1"))
            .await
            .unwrap();
        assert_eq!(delivered.content, "body{color:red}");
        assert_eq!(delivered.mime, "text/css");
        assert!(delivered.headers.etag.is_none());
        assert_eq!(delivered.headers.max_age_seconds, 60);
    }

    #[test]
    fn test_bundle_pipeline_override_unknown_processor() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        e.create_bundle(
            "site",
            WebFileType::Script,
            vec![WebFile::script("js/a.js")],
            BundleOptions {
                pipeline: Some(vec!["nope".to_string()]),
                ..Default::default()
            },
        );
        let bundle = e.bundles.get("site").unwrap();
        let err = e.pipeline_for(&bundle).unwrap_err();
        assert!(matches!(err, SmeltError::UnknownProcessor(_)));
    }
}
