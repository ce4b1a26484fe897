use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::command::CommandRunner;
use super::{require_pattern, CompilerAdapter, CompilerError};
use crate::types::task::Language;

static CONTRACT_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*class\s+\w+\s*\(\s*sp\.Contract\s*\)\s*:").expect("valid regex"));

/// Suffix of the compiled contract the SmartPy CLI writes for each target.
const CONTRACT_OUTPUT_SUFFIX: &str = "_contract.json";

/// SmartPy writes its output into a directory; the contract JSON is read back from there.
pub struct SmartPyCompiler {
    binary: String,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl SmartPyCompiler {
    pub fn new(binary: &str, runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { binary: binary.to_string(), runner, timeout }
    }
}

/// First `*_contract.json` below `root`, in path order.
async fn find_contract_output(root: &Path) -> Result<Option<PathBuf>, CompilerError> {
    let mut pending = vec![root.to_path_buf()];
    let mut found = Vec::new();
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(CONTRACT_OUTPUT_SUFFIX)) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}

#[async_trait]
impl CompilerAdapter for SmartPyCompiler {
    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn language(&self, extension: &str) -> Option<Language> {
        (extension == "py").then_some(Language::SmartPy)
    }

    fn validate(&self, path: &Path, language: Language, source: &str) -> Result<(), CompilerError> {
        require_pattern(path, language, source, &CONTRACT_CLASS, "a class deriving from `sp.Contract`")
    }

    async fn compile(&self, path: &Path, _language: Language) -> Result<Value, CompilerError> {
        let output_dir = tempfile::Builder::new().prefix("smartpy-").tempdir()?;
        let args = vec!["compile".to_string(), path.display().to_string(), output_dir.path().display().to_string()];

        let output = self.runner.run(&self.binary, &args, self.timeout).await?;
        if let Some(message) = output.exit_error {
            return Err(CompilerError::Toolchain { program: self.binary.clone(), message });
        }

        let contract = find_contract_output(output_dir.path()).await?.ok_or_else(|| {
            CompilerError::MalformedOutput {
                program: self.binary.clone(),
                message: format!("no *{CONTRACT_OUTPUT_SUFFIX} written"),
            }
        })?;
        let raw = tokio::fs::read_to_string(&contract).await?;
        serde_json::from_str(&raw)
            .map_err(|e| CompilerError::MalformedOutput { program: self.binary.clone(), message: e.to_string() })
    }
}
