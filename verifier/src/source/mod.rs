pub mod archive;
pub mod upload;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use thiserror::Error;

use crate::types::constant::TASK_DIR_PREFIX;

/// Failures while materializing a task's sources. Any of them fails the task
/// before it is enqueued.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Unsupported file extension: {file}")]
    UnsupportedExtension { file: String },

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("No source files were submitted")]
    EmptyUpload,

    #[error("Archive not found at {url}")]
    ArchiveNotFound { url: String },

    #[error("Archive download from {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Archive entry escapes the task directory: {0}")]
    PathTraversal(String),

    #[error("Archive contains no supported source files")]
    NoSupportedFiles,

    #[error("Invalid repository reference: {0}")]
    InvalidRepository(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fresh `task-*` directory under the working root. Dropping it removes the
/// directory; [`TaskDir::keep`] hands ownership to the worker once the task is queued.
#[derive(Debug)]
pub struct TaskDir {
    dir: TempDir,
}

impl TaskDir {
    pub fn create(root: &Path) -> Result<Self, AcquisitionError> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix(TASK_DIR_PREFIX).tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn keep(self) -> PathBuf {
        self.dir.into_path()
    }
}

/// True when `dir` is a task directory directly below `root`. Only such
/// directories are ever removed on behalf of a queue message.
pub fn is_task_dir(root: &Path, dir: &Path) -> bool {
    dir.parent() == Some(root)
        && dir.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with(TASK_DIR_PREFIX))
}

/// Remove a task directory, tolerating one that is already gone.
pub async fn remove_task_dir(root: &Path, dir: &Path) {
    if !is_task_dir(root, dir) {
        tracing::warn!(dir = %dir.display(), root = %root.display(), "Refusing to remove a directory outside the working root");
        return;
    }
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => tracing::debug!(dir = %dir.display(), "Removed task directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove task directory"),
    }
}

/// Remove task directories older than `ttl`, left behind by a crashed process.
/// Returns how many were removed.
pub async fn sweep_stale_dirs(root: &Path, ttl: Duration) -> Result<usize, AcquisitionError> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = entry.metadata().await?;
        if !metadata.is_dir() || !is_task_dir(root, &path) {
            continue;
        }
        let age = metadata.modified().ok().and_then(|m| now.duration_since(m).ok()).unwrap_or_default();
        if age > ttl {
            tokio::fs::remove_dir_all(&path).await?;
            tracing::info!(dir = %path.display(), age_secs = age.as_secs(), "Removed stale task directory");
            removed += 1;
        }
    }
    Ok(removed)
}
