use thiserror::Error;

use crate::sources::SourceError;

/// Errors raised by the snapshot store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot for {0} already published (use --force to replace it)")]
    AlreadyPublished(String),

    #[error("No snapshot found: {0}")]
    NotFound(String),

    #[error("Invalid snapshot date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

impl StoreError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io { path: path.display().to_string(), source }
    }

    pub fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        StoreError::Json { path: path.display().to_string(), source }
    }
}

/// Run-level failures. Anything surfacing here aborts the run before publish.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Primary pool source failed: {0}")]
    PrimarySource(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
