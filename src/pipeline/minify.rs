//! Minifier stages for JS and CSS.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Unlike a build-time
//! minifier that can fall back to the original text, a pipeline stage
//! reports malformed source as a per-file error so the cache never holds
//! half-processed output.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use super::{BoxFuture, FileProcessContext, PreProcessor};
use crate::error::Result;

pub const JS_MINIFIER: &str = "js-minifier";
pub const CSS_MINIFIER: &str = "css-minifier";

/// Minify JavaScript with oxc (mangle + maximum compression).
pub struct JsMinifier;

impl JsMinifier {
    fn minify(&self, source: &str) -> std::result::Result<String, String> {
        let allocator = Allocator::default();
        let source_type = SourceType::mjs();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if !ret.errors.is_empty() {
            let first = ret
                .errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(format!("parse failed: {first}"));
        }
        let mut program = ret.program;
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        let ret = Minifier::new(options).minify(&allocator, &mut program);
        let code = Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(ret.scoping)
            .build(&program)
            .code;
        Ok(code)
    }
}

impl PreProcessor for JsMinifier {
    fn name(&self) -> &'static str {
        JS_MINIFIER
    }

    fn process<'a>(
        &'a self,
        content: String,
        ctx: &'a FileProcessContext<'a>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.minify(&content)
                .map_err(|msg| ctx.stage_error(JS_MINIFIER, msg))
        })
    }
}

/// Minify CSS with lightningcss.
pub struct CssMinifier;

impl CssMinifier {
    fn minify(&self, source: &str) -> std::result::Result<String, String> {
        let stylesheet = StyleSheet::parse(source, ParserOptions::default())
            .map_err(|e| format!("parse failed: {e}"))?;
        let result = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| format!("print failed: {e}"))?;
        Ok(result.code)
    }
}

impl PreProcessor for CssMinifier {
    fn name(&self) -> &'static str {
        CSS_MINIFIER
    }

    fn process<'a>(
        &'a self,
        content: String,
        ctx: &'a FileProcessContext<'a>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.minify(&content)
                .map_err(|msg| ctx.stage_error(CSS_MINIFIER, msg))
        })
    }
}
