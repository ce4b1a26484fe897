use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::{AcquisitionError, TaskDir};
use crate::compiler::CompilerRegistry;

/// One file field of a submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self { name: name.into(), content: content.into() }
    }

    /// Read a local file, keeping only its base name.
    pub async fn from_path(path: &Path) -> Result<Self, AcquisitionError> {
        let name = base_name(&path.display().to_string())?;
        let content = tokio::fs::read(path).await?;
        Ok(Self::new(name, content))
    }
}

fn base_name(name: &str) -> Result<String, AcquisitionError> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AcquisitionError::InvalidFileName(name.to_string()))
}

/// Write uploaded files into `dir` under their base names. Every file is checked
/// before anything is written, so one unsupported file rejects the whole upload.
pub async fn persist_uploads(
    dir: &TaskDir,
    files: &[UploadedFile],
    compilers: &CompilerRegistry,
) -> Result<Vec<PathBuf>, AcquisitionError> {
    if files.is_empty() {
        return Err(AcquisitionError::EmptyUpload);
    }

    let mut targets = Vec::with_capacity(files.len());
    for file in files {
        let name = base_name(&file.name)?;
        if !compilers.supports(Path::new(&name)) {
            return Err(AcquisitionError::UnsupportedExtension { file: file.name.clone() });
        }
        targets.push((dir.path().join(name), &file.content));
    }

    let mut written = Vec::with_capacity(targets.len());
    for (target, content) in targets {
        tokio::fs::write(&target, content).await?;
        written.push(target);
    }
    written.sort();
    written.dedup();
    Ok(written)
}
