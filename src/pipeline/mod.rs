//! Pre-processing pipeline.
//!
//! A pipeline is an ordered sequence of stage handles run over one
//! file's content; any stage failure aborts the pipeline for that file
//! and is reported against the file's identity. Stages are composed,
//! not inherited: new transformations implement `PreProcessor` and slot
//! into a pipeline wherever the embedding application wants them.

pub mod css_import;
pub mod css_url;
pub mod minify;

pub use css_import::CssImportProcessor;
pub use css_url::CssUrlProcessor;
pub use minify::{CssMinifier, JsMinifier};

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::SmeltOptions;
use crate::core::{WebFile, WebFileType};
use crate::error::{Result, SmeltError};

/// Boxed future so stage implementations stay object-safe while any of
/// them may suspend for I/O.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything a stage may consult besides the text it transforms.
pub struct FileProcessContext<'a> {
    /// The file being processed, with its resolved path.
    pub file: &'a WebFile,
    /// Absolute filesystem location of the source.
    pub source_path: PathBuf,
    pub options: &'a SmeltOptions,
}

impl FileProcessContext<'_> {
    /// Convenience for stage error reporting.
    pub fn stage_error(&self, stage: &'static str, message: impl Into<String>) -> SmeltError {
        SmeltError::PipelineStage {
            stage,
            file: self.file.path.clone(),
            message: message.into(),
        }
    }
}

/// A single named transformation stage over file text.
pub trait PreProcessor: Send + Sync {
    /// Stable stage identity; part of the cache key.
    fn name(&self) -> &'static str;

    /// Transform the current text, or fail with a stage-specific error.
    fn process<'a>(
        &'a self,
        content: String,
        ctx: &'a FileProcessContext<'a>,
    ) -> BoxFuture<'a, Result<String>>;
}

/// Ordered sequence of stages executed over one file's content.
#[derive(Clone)]
pub struct PreProcessPipeline {
    stages: Vec<Arc<dyn PreProcessor>>,
}

impl PreProcessPipeline {
    pub fn new(stages: Vec<Arc<dyn PreProcessor>>) -> Self {
        Self { stages }
    }

    /// Stage-sequence identity, e.g. `css-import>css-url>css-minifier`.
    /// Part of the cache key so different pipelines never share output.
    pub fn identity(&self) -> String {
        self.stages
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(">")
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order. The first failing stage aborts.
    pub async fn process(
        &self,
        mut content: String,
        ctx: &FileProcessContext<'_>,
    ) -> Result<String> {
        for stage in &self.stages {
            content = stage.process(content, ctx).await?;
        }
        Ok(content)
    }
}

impl std::fmt::Debug for PreProcessPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PreProcessPipeline")
            .field(&self.identity())
            .finish()
    }
}

/// Resolves default pipelines per file type and builds explicit ones by
/// processor name.
pub struct PipelineFactory {
    all: Vec<Arc<dyn PreProcessor>>,
}

impl PipelineFactory {
    /// Factory over an explicit processor set.
    pub fn new(all: Vec<Arc<dyn PreProcessor>>) -> Self {
        Self { all }
    }

    /// Factory over the standard processor set.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Arc::new(CssImportProcessor),
            Arc::new(CssUrlProcessor::new()),
            Arc::new(CssMinifier),
            Arc::new(JsMinifier),
        ])
    }

    /// Register an additional processor, available to explicit pipelines
    /// by name.
    pub fn register(&mut self, processor: Arc<dyn PreProcessor>) {
        self.all.push(processor);
    }

    /// The default pipeline for a file type:
    /// scripts → minify; styles → inline imports, absolutize urls, minify.
    pub fn default_pipeline(&self, file_type: WebFileType) -> PreProcessPipeline {
        let names: &[&str] = match file_type {
            WebFileType::Script => &[minify::JS_MINIFIER],
            WebFileType::Style => &[
                css_import::CSS_IMPORT,
                css_url::CSS_URL,
                minify::CSS_MINIFIER,
            ],
        };
        self.pipeline(names)
            .unwrap_or_else(|_| unreachable!("default processors are always registered"))
    }

    /// Build a pipeline from an explicit ordered set of processor names.
    /// An unknown name is a configuration error and fails immediately.
    pub fn pipeline(&self, names: &[impl AsRef<str>]) -> Result<PreProcessPipeline> {
        let mut stages = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let stage = self
                .all
                .iter()
                .find(|p| p.name() == name)
                .ok_or_else(|| SmeltError::UnknownProcessor(name.to_string()))?;
            stages.push(stage.clone());
        }
        Ok(PreProcessPipeline::new(stages))
    }
}

impl Default for PipelineFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    struct Exclaim;
    impl PreProcessor for Exclaim {
        fn name(&self) -> &'static str {
            "exclaim"
        }
        fn process<'a>(
            &'a self,
            content: String,
            _ctx: &'a FileProcessContext<'a>,
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move { Ok(format!("{content}!")) })
        }
    }

    struct Fails;
    impl PreProcessor for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }
        fn process<'a>(
            &'a self,
            _content: String,
            ctx: &'a FileProcessContext<'a>,
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move { Err(ctx.stage_error("fails", "broken input")) })
        }
    }

    fn ctx_fixture<'a>(file: &'a WebFile, options: &'a SmeltOptions) -> FileProcessContext<'a> {
        FileProcessContext {
            file,
            source_path: options.source_root.join(&file.path),
            options,
        }
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let pipeline =
            PreProcessPipeline::new(vec![Arc::new(Upper), Arc::new(Exclaim)]);
        let file = WebFile::script("js/a.js");
        let options = SmeltOptions::default();
        let out = pipeline
            .process("hi".to_string(), &ctx_fixture(&file, &options))
            .await
            .unwrap();
        assert_eq!(out, "HI!");
    }

    #[tokio::test]
    async fn test_failure_aborts_pipeline() {
        let pipeline = PreProcessPipeline::new(vec![
            Arc::new(Upper),
            Arc::new(Fails),
            Arc::new(Exclaim),
        ]);
        let file = WebFile::script("js/a.js");
        let options = SmeltOptions::default();
        let err = pipeline
            .process("hi".to_string(), &ctx_fixture(&file, &options))
            .await
            .unwrap_err();
        match err {
            SmeltError::PipelineStage { stage, file, .. } => {
                assert_eq!(stage, "fails");
                assert_eq!(file, "js/a.js");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identity_reflects_stage_sequence() {
        let pipeline =
            PreProcessPipeline::new(vec![Arc::new(Upper), Arc::new(Exclaim)]);
        assert_eq!(pipeline.identity(), "upper>exclaim");
    }

    #[test]
    fn test_default_pipelines() {
        let factory = PipelineFactory::with_defaults();
        assert_eq!(
            factory.default_pipeline(WebFileType::Script).identity(),
            "js-minifier"
        );
        assert_eq!(
            factory.default_pipeline(WebFileType::Style).identity(),
            "css-import>css-url>css-minifier"
        );
    }

    #[test]
    fn test_explicit_pipeline_by_name() {
        let factory = PipelineFactory::with_defaults();
        let pipeline = factory.pipeline(&["css-minifier"]).unwrap();
        assert_eq!(pipeline.identity(), "css-minifier");
    }

    #[test]
    fn test_unknown_processor_fails() {
        let factory = PipelineFactory::with_defaults();
        let err = factory.pipeline(&["nope"]).unwrap_err();
        assert!(matches!(err, SmeltError::UnknownProcessor(name) if name == "nope"));
    }
}
