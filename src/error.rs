//! Engine error taxonomy.
//!
//! Programmer/configuration misuse and capacity problems are hard errors;
//! malformed client input never surfaces here (URL parsing returns `None`
//! instead, see `url::parse_path`).

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the bundling engine.
#[derive(Debug, Error)]
pub enum SmeltError {
    /// A requested bundle name is not registered.
    ///
    /// Distinct from an empty bundle: callers must surface this as
    /// not-found rather than rendering nothing.
    #[error("bundle not found: `{0}`")]
    BundleNotFound(String),

    /// A single file path alone exceeds the maximum URL length.
    ///
    /// Deployment misconfiguration: either shorten the path or raise
    /// `max_url_length`.
    #[error(
        "the path for the single dependency `{path}` exceeds the max URL length ({limit}); \
         reduce the dependency's path length or increase max_url_length"
    )]
    PathTooLong { path: String, limit: usize },

    /// Declared file dependencies form a cycle.
    #[error("cyclic file dependency: {}", .members.join(" -> "))]
    DependencyCycle { members: Vec<String> },

    /// A pipeline stage rejected a file.
    #[error("processor `{stage}` failed for `{file}`: {message}")]
    PipelineStage {
        stage: &'static str,
        file: String,
        message: String,
    },

    /// A pipeline was requested with a processor name the factory does
    /// not know.
    #[error("unknown pre-processor: `{0}`")]
    UnknownProcessor(String),

    #[error("invalid engine options: {0}")]
    Options(String),

    /// A spawned processing task was torn down before completing.
    #[error("processing task failed: {0}")]
    Task(String),

    /// A decoded composite key has no registered file set, e.g. a stale
    /// URL from before a restart. Transport answers not-found.
    #[error("unknown composite key: `{0}`")]
    UnknownCompositeKey(String),

    #[error("IO error for `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

impl SmeltError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(path.into(), err)
    }
}

// Shared processing outcomes are fanned out to every waiter.
// `io::Error` carries no `Clone`; rebuild it from kind and text.
impl Clone for SmeltError {
    fn clone(&self) -> Self {
        match self {
            Self::BundleNotFound(name) => Self::BundleNotFound(name.clone()),
            Self::PathTooLong { path, limit } => Self::PathTooLong {
                path: path.clone(),
                limit: *limit,
            },
            Self::DependencyCycle { members } => Self::DependencyCycle {
                members: members.clone(),
            },
            Self::PipelineStage {
                stage,
                file,
                message,
            } => Self::PipelineStage {
                stage: *stage,
                file: file.clone(),
                message: message.clone(),
            },
            Self::UnknownProcessor(name) => Self::UnknownProcessor(name.clone()),
            Self::Options(message) => Self::Options(message.clone()),
            Self::Task(message) => Self::Task(message.clone()),
            Self::UnknownCompositeKey(key) => Self::UnknownCompositeKey(key.clone()),
            Self::Io(path, err) => Self::Io(
                path.clone(),
                std::io::Error::new(err.kind(), err.to_string()),
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, SmeltError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_too_long_names_offender() {
        let err = SmeltError::PathTooLong {
            path: "Js/really/long/one".to_string(),
            limit: 100,
        };
        let display = format!("{err}");
        assert!(display.contains("Js/really/long/one"));
        assert!(display.contains("100"));
    }

    #[test]
    fn test_cycle_names_members() {
        let err = SmeltError::DependencyCycle {
            members: vec!["a.js".into(), "b.js".into(), "a.js".into()],
        };
        assert_eq!(format!("{err}"), "cyclic file dependency: a.js -> b.js -> a.js");
    }
}
