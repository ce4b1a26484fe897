pub mod command;
pub mod error;
pub mod ligo;
pub mod michelson;
pub mod smartpy;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
pub use command::{CommandOutput, CommandRunner, ProcessRunner};
pub use error::CompilerError;
use regex::Regex;

use crate::types::params::service::CompilerParams;
use crate::types::task::Language;

/// A compiled contract in Micheline JSON together with its source language.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledScript {
    pub script: serde_json::Value,
    pub language: Language,
}

/// One external toolchain, possibly serving several languages.
#[async_trait]
pub trait CompilerAdapter: Send + Sync {
    /// Lowercase file extensions, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    fn language(&self, extension: &str) -> Option<Language>;

    /// Reject sources that cannot be a contract in `language` before invoking the toolchain.
    fn validate(&self, path: &Path, language: Language, source: &str) -> Result<(), CompilerError>;

    async fn compile(&self, path: &Path, language: Language) -> Result<serde_json::Value, CompilerError>;
}

/// Fails with [`CompilerError::ContentMismatch`] unless `pattern` occurs in `source`.
pub(crate) fn require_pattern(
    path: &Path,
    language: Language,
    source: &str,
    pattern: &Regex,
    expected: &str,
) -> Result<(), CompilerError> {
    if pattern.is_match(source) {
        Ok(())
    } else {
        Err(CompilerError::ContentMismatch { file: path.to_path_buf(), language, expected: expected.to_string() })
    }
}

/// Lowercase extension of `path`, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase())
}

/// Extension to adapter table. Built once at start-up and shared by the producer
/// and the worker; adding a language means registering another adapter.
#[derive(Clone, Default)]
pub struct CompilerRegistry {
    adapters: BTreeMap<String, Arc<dyn CompilerAdapter>>,
}

impl CompilerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the LIGO family, plain Michelson and SmartPy.
    pub fn with_defaults(params: &CompilerParams, runner: Arc<dyn CommandRunner>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ligo::LigoCompiler::new(&params.ligo_binary, runner.clone(), params.timeout)));
        registry.register(Arc::new(michelson::MichelsonCompiler::new(
            &params.octez_client_binary,
            runner.clone(),
            params.timeout,
        )));
        registry.register(Arc::new(smartpy::SmartPyCompiler::new(&params.smartpy_binary, runner, params.timeout)));
        registry
    }

    /// Register `adapter` for every extension it declares, replacing previous owners.
    pub fn register(&mut self, adapter: Arc<dyn CompilerAdapter>) {
        for extension in adapter.extensions() {
            self.adapters.insert(extension.to_string(), adapter.clone());
        }
    }

    pub fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|e| self.adapters.contains_key(&e))
    }

    pub fn supported_extensions(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    pub fn language_of(&self, path: &Path) -> Option<Language> {
        let extension = extension_of(path)?;
        self.adapters.get(&extension)?.language(&extension)
    }

    /// Validate and compile a single file.
    pub async fn compile(&self, path: &Path) -> Result<CompiledScript, CompilerError> {
        let unsupported = || CompilerError::UnsupportedExtension(path.to_path_buf());
        let extension = extension_of(path).ok_or_else(unsupported)?;
        let adapter = self.adapters.get(&extension).ok_or_else(unsupported)?;
        let language = adapter.language(&extension).ok_or_else(unsupported)?;

        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CompilerError::ReadSource { file: path.to_path_buf(), source })?;
        adapter.validate(path, language, &source)?;

        let script = adapter.compile(path, language).await?;
        Ok(CompiledScript { script, language })
    }
}

impl std::fmt::Debug for CompilerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerRegistry").field("extensions", &self.supported_extensions()).finish()
    }
}
