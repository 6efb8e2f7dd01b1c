//! Processed-output cache.
//!
//! Storage is a flat key → blob interface with atomic publication;
//! `PreProcessManager` layers freshness checking and per-key
//! single-flight on top of it.

mod manager;
mod store;

pub use manager::PreProcessManager;
pub use store::{CacheStore, FileCacheStore};
