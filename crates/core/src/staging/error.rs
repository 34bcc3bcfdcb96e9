//! Staging error types.

use std::path::PathBuf;

use thiserror::Error;

/// Local staging area errors.
#[derive(Debug, Error)]
pub enum StagingError {
    /// Filesystem operation failed.
    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path does not belong to the staging area.
    #[error("path {} is outside the staging root", .0.display())]
    OutsideRoot(PathBuf),
}
