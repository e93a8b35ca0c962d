//! Error types for xref operations

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum XrefError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Glob pattern error: {0}")]
    GlobPattern(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl XrefError {
    /// Whether the condition should be reported to the caller as readable
    /// content rather than as a failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PathNotFound(_))
    }
}
