//! Filesystem-backed staging area.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use elib_shared::StagingConfig;

use super::error::StagingError;
use crate::catalog::StagingArea;
use crate::storage::sanitize_filename;

/// Staging area rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStaging {
    root: PathBuf,
}

/// Outcome of a [`LocalStaging::sweep`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale files deleted.
    pub removed: usize,
    /// Files younger than the threshold.
    pub retained: usize,
    /// Stale files that could not be deleted.
    pub failed: usize,
}

impl LocalStaging {
    /// Create a staging area under `root`. The directory is created on first `put`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a staging area from configuration.
    #[must_use]
    pub fn from_config(config: &StagingConfig) -> Self {
        Self::new(config.root.clone())
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` names a file directly or indirectly under the root.
    fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
            && path != self.root
            && !path.components().any(|c| matches!(c, Component::ParentDir))
    }

    fn check(&self, path: &Path) -> Result<(), StagingError> {
        if self.contains(path) {
            Ok(())
        } else {
            Err(StagingError::OutsideRoot(path.to_path_buf()))
        }
    }

    /// Generated file name for a client-declared name: `{uuid}.{ext}`.
    fn generated_name(declared_name: &str) -> String {
        let id = Uuid::new_v4().simple();
        let ext = Path::new(declared_name)
            .extension()
            .map(|e| sanitize_filename(&e.to_string_lossy()).to_ascii_lowercase())
            .filter(|e| !e.is_empty());
        match ext {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        }
    }

    /// Delete staged files last modified at least `max_age` ago.
    ///
    /// Subdirectories are left alone. A missing root is an empty sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be read.
    pub async fn sweep(&self, max_age: Duration) -> Result<SweepReport, StagingError> {
        let mut report = SweepReport::default();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat staged file");
                    report.failed += 1;
                    continue;
                }
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);
            if age < max_age {
                report.retained += 1;
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "Swept staged file");
                    report.removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to sweep staged file");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

impl StagingArea for LocalStaging {
    async fn put(&self, bytes: Bytes, declared_name: &str) -> Result<PathBuf, StagingError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(Self::generated_name(declared_name));
        tokio::fs::write(&path, &bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "File staged");
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> Result<(), StagingError> {
        self.check(path)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        self.contains(path) && tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
