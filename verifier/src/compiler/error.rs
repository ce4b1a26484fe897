use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::task::Language;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("No compiler registered for {0:?}")]
    UnsupportedExtension(PathBuf),

    #[error("{file:?} does not look like a {language} contract: {expected}")]
    ContentMismatch { file: PathBuf, language: Language, expected: String },

    #[error("Failed to read {file:?}: {source}")]
    ReadSource {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} failed: {message}")]
    Toolchain { program: String, message: String },

    #[error("{program} produced malformed output: {message}")]
    MalformedOutput { program: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
