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

static CAMELIGO_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(\[@entry\]|^\s*let\s+main\b)").expect("valid regex"));
static REASONLIGO_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(\[@entry\]|^\s*let\s+main\b)").expect("valid regex"));
static JSLIGO_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(@entry\b|^\s*(export\s+)?(const|function)\s+main\b)").expect("valid regex"));
static PASCALIGO_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(\[@entry\]|^\s*function\s+main\b)").expect("valid regex"));

/// The LIGO family shares one compiler entrypoint; the syntax is picked from the extension.
pub struct LigoCompiler {
    binary: String,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl LigoCompiler {
    pub fn new(binary: &str, runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { binary: binary.to_string(), runner, timeout }
    }
}

/// Newer LIGO releases wrap the expression as `{"michelson": {"expression": ...}}`.
fn unwrap_michelson(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("michelson") => match map.remove("michelson") {
            Some(Value::Object(mut inner)) if inner.contains_key("expression") => {
                inner.remove("expression").unwrap_or(Value::Null)
            }
            Some(other) => other,
            None => Value::Null,
        },
        other => other,
    }
}

#[async_trait]
impl CompilerAdapter for LigoCompiler {
    fn extensions(&self) -> &'static [&'static str] {
        &["mligo", "religo", "jsligo", "ligo"]
    }

    fn language(&self, extension: &str) -> Option<Language> {
        match extension {
            "mligo" => Some(Language::CameLigo),
            "religo" => Some(Language::ReasonLigo),
            "jsligo" => Some(Language::JsLigo),
            "ligo" => Some(Language::PascaLigo),
            _ => None,
        }
    }

    fn validate(&self, path: &Path, language: Language, source: &str) -> Result<(), CompilerError> {
        let (pattern, expected) = match language {
            Language::CameLigo => (&*CAMELIGO_ENTRY, "an `[@entry]` or `let main` declaration"),
            Language::ReasonLigo => (&*REASONLIGO_ENTRY, "an `[@entry]` or `let main` declaration"),
            Language::JsLigo => (&*JSLIGO_ENTRY, "an `@entry` or `main` declaration"),
            Language::PascaLigo => (&*PASCALIGO_ENTRY, "an `[@entry]` or `function main` declaration"),
            other => {
                return Err(CompilerError::ContentMismatch {
                    file: path.to_path_buf(),
                    language: other,
                    expected: "a LIGO source".to_string(),
                })
            }
        };
        require_pattern(path, language, source, pattern, expected)
    }

    async fn compile(&self, path: &Path, _language: Language) -> Result<Value, CompilerError> {
        let args = vec![
            "compile".to_string(),
            "contract".to_string(),
            path.display().to_string(),
            "--michelson-format".to_string(),
            "json".to_string(),
        ];
        let output = self.runner.run(&self.binary, &args, self.timeout).await?;
        parse_script(&self.binary, output).map(unwrap_michelson)
    }
}
