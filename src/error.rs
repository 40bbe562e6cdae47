//! Typed failures of the embedding-and-retrieval core.
//!
//! Every fallible library operation returns [`Result`]. None of these are
//! retried internally; callers decide how to surface them.

use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, DscvrError>;

#[derive(Debug, thiserror::Error)]
pub enum DscvrError {
    /// Empty or degenerate corpus at build time.
    #[error("data error: {0}")]
    Data(String),

    /// One of the three artifacts (or the generation pointer) is absent.
    #[error("artifact missing: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// Artifacts exist but disagree with each other.
    #[error("artifacts inconsistent: {0}")]
    ArtifactInconsistent(String),

    #[error("row index {index} out of range [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Fuzzy lookup found nothing at or above the cutoff, or the query was empty.
    #[error("no catalog match for query {query:?}")]
    NoMatch { query: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl DscvrError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::ArtifactInconsistent(msg.into())
    }

    /// `true` for the error kinds a serving layer reports as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoMatch { .. })
    }
}
