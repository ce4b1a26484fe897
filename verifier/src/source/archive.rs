use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::StatusCode;
use url::Url;

use super::{AcquisitionError, TaskDir};
use crate::compiler::{extension_of, CompilerRegistry};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Repository archives served by a GitHub compatible host as gzipped tarballs.
#[derive(Debug, Clone)]
pub struct GithubArchive {
    client: reqwest::Client,
    base_url: Url,
    max_retries: u32,
    retry_delay: Duration,
}

impl GithubArchive {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("contract-verifier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcquisitionError::Download { url: base_url.to_string(), message: e.to_string() })?;
        Ok(Self { client, base_url, max_retries: DEFAULT_MAX_RETRIES, retry_delay: DEFAULT_RETRY_DELAY })
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// `<base>/<owner>/<repo>/archive/<ref>.tar.gz`
    pub fn archive_url(&self, owner: &str, repo: &str, reference: &str) -> Result<Url, AcquisitionError> {
        if [owner, repo, reference].iter().any(|s| s.is_empty() || s.contains('/') || *s == "..") {
            return Err(AcquisitionError::InvalidRepository(format!("{owner}/{repo}@{reference}")));
        }
        let tarball = format!("{reference}.tar.gz");
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AcquisitionError::InvalidRepository(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([owner, repo, "archive", tarball.as_str()]);
        Ok(url)
    }

    /// GET `url`, retrying transport failures and server errors. A 404 fails at once.
    pub async fn download(&self, url: &Url) -> Result<Bytes, AcquisitionError> {
        let mut attempt = 0;
        loop {
            let failure = match self.client.get(url.clone()).send().await {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    return Err(AcquisitionError::ArchiveNotFound { url: url.to_string() });
                }
                Ok(response) if response.status().is_success() => match response.bytes().await {
                    Ok(bytes) => return Ok(bytes),
                    Err(e) => e.to_string(),
                },
                Ok(response) if response.status().is_server_error() => format!("status {}", response.status()),
                Ok(response) => {
                    return Err(AcquisitionError::Download {
                        url: url.to_string(),
                        message: format!("status {}", response.status()),
                    });
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                return Err(AcquisitionError::Download { url: url.to_string(), message: failure });
            }
            attempt += 1;
            tracing::warn!(url = %url, attempt, error = %failure, "Archive download failed, retrying");
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Download the repository at `reference` and extract its supported sources into `dir`.
    pub async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
        dir: &TaskDir,
        compilers: &CompilerRegistry,
    ) -> Result<Vec<PathBuf>, AcquisitionError> {
        let url = self.archive_url(owner, repo, reference)?;
        tracing::info!(url = %url, "Downloading repository archive");
        let archive = self.download(&url).await?;

        let dest = dir.path().to_path_buf();
        let extensions = compilers.supported_extensions();
        let files = tokio::task::spawn_blocking(move || extract_archive(archive.as_ref(), &dest, &extensions))
            .await
            .map_err(|e| AcquisitionError::InvalidArchive(e.to_string()))??;

        if files.is_empty() {
            return Err(AcquisitionError::NoSupportedFiles);
        }
        Ok(files)
    }
}

fn invalid(e: std::io::Error) -> AcquisitionError {
    AcquisitionError::InvalidArchive(e.to_string())
}

/// Unpack a gzipped tarball into `dest`. The leading `<repo>-<ref>/` component is
/// stripped, the remaining layout is kept, and only files whose extension is in
/// `extensions` are written. Returns the written paths, sorted.
pub fn extract_archive(
    archive: impl Read,
    dest: &Path,
    extensions: &[String],
) -> Result<Vec<PathBuf>, AcquisitionError> {
    let mut archive = tar::Archive::new(GzDecoder::new(archive));
    let mut files = Vec::new();

    for entry in archive.entries().map_err(invalid)? {
        let mut entry = entry.map_err(invalid)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path().map_err(invalid)?.into_owned();
        let relative: PathBuf = path.components().skip(1).collect();
        if relative.as_os_str().is_empty() {
            continue;
        }
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AcquisitionError::PathTraversal(path.display().to_string()));
        }
        if !extension_of(&relative).is_some_and(|e| extensions.contains(&e)) {
            continue;
        }

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target).map_err(invalid)?;
        files.push(target);
    }

    files.sort();
    Ok(files)
}
