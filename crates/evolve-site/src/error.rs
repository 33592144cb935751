//! Site error types.

use evolve_snapshot::SnapshotError;
use thiserror::Error;

/// Result type for site operations.
pub type SiteResult<T> = Result<T, SiteError>;

/// Errors that can occur while staging, publishing or rolling back.
#[derive(Debug, Error)]
pub enum SiteError {
    /// A name outside the managed file set.
    #[error("Not a managed file: {0}")]
    UnknownFile(String),

    /// Filesystem operation failed.
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot archive error.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl SiteError {
    pub(crate) fn io(
        action: &'static str,
        path: &std::path::Path,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.display().to_string(),
            source,
        }
    }
}
