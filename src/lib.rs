//! smelt — a web-asset bundling engine.
//!
//! Declared bundles of scripts and stylesheets are resolved into a
//! stable order, partitioned into composite units, addressed by
//! length-bounded cache-busting URLs, and produced on demand through an
//! async pre-processing pipeline backed by an on-disk cache with
//! per-key single-flight.
//!
//! The crate is transport-agnostic: an embedding HTTP server calls
//! [`engine::SmeltEngine`] to generate URLs during a page render and to
//! assemble content plus cache headers when a generated URL is
//! requested back.

pub mod batch;
pub mod bundle;
pub mod cache;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod hash;
pub mod logger;
pub mod order;
pub mod pipeline;
pub mod url;

pub use crate::config::SmeltOptions;
pub use crate::core::{BundleOptions, CacheBuster, CacheHeaders, WebFile, WebFileType};
pub use crate::engine::{DeliveryContent, RequestScope, SmeltEngine};
pub use crate::error::{Result, SmeltError};
