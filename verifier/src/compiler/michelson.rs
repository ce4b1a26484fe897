use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::command::{parse_script, CommandRunner};
use super::{require_pattern, CompilerAdapter, CompilerError};
use crate::types::task::Language;

static SECTIONS: [(&str, Lazy<Regex>); 3] = [
    ("parameter", Lazy::new(|| Regex::new(r"\bparameter\b").expect("valid regex"))),
    ("storage", Lazy::new(|| Regex::new(r"\bstorage\b").expect("valid regex"))),
    ("code", Lazy::new(|| Regex::new(r"\bcode\b").expect("valid regex"))),
];

/// Canonicalizes plain Michelson to JSON through `octez-client` in mockup mode.
pub struct MichelsonCompiler {
    binary: String,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl MichelsonCompiler {
    pub fn new(binary: &str, runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { binary: binary.to_string(), runner, timeout }
    }
}

#[async_trait]
impl CompilerAdapter for MichelsonCompiler {
    fn extensions(&self) -> &'static [&'static str] {
        &["tz"]
    }

    fn language(&self, extension: &str) -> Option<Language> {
        (extension == "tz").then_some(Language::Michelson)
    }

    fn validate(&self, path: &Path, language: Language, source: &str) -> Result<(), CompilerError> {
        for (section, pattern) in SECTIONS.iter() {
            require_pattern(path, language, source, pattern, &format!("a `{section}` section"))?;
        }
        Ok(())
    }

    async fn compile(&self, path: &Path, _language: Language) -> Result<Value, CompilerError> {
        let source = path.display().to_string();
        let args = ["--mode", "mockup", "convert", "script", source.as_str(), "from", "michelson", "to", "json"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let output = self.runner.run(&self.binary, &args, self.timeout).await?;
        parse_script(&self.binary, output)
    }
}
