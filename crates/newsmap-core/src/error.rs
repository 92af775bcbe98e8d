use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsmapError {
    #[error("content query failed: {0}")]
    Fetch(String),

    #[error("sitemap serialization failed: {0}")]
    Build(String),

    #[error("sitemap cache could not be written to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache has never been written. A normal state before the first build.
    #[error("sitemap cache not found")]
    NotFound,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("schedule database error: {0}")]
    ScheduleDb(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NewsmapError {
    /// True for failures raised by a build cycle (fetch, serialize, persist).
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            NewsmapError::Fetch(_) | NewsmapError::Build(_) | NewsmapError::Write { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, NewsmapError>;
