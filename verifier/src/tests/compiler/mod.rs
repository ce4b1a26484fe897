use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use rstest::rstest;
use serde_json::json;

use crate::compiler::command::MockCommandRunner;
use crate::compiler::ligo::LigoCompiler;
use crate::compiler::michelson::MichelsonCompiler;
use crate::compiler::smartpy::SmartPyCompiler;
use crate::compiler::{CommandOutput, CompilerError, CompilerRegistry};
use crate::tests::common::{script, MICHELSON_SOURCE};
use crate::types::params::service::CompilerParams;
use crate::types::task::Language;

const TIMEOUT: Duration = Duration::from_secs(30);

const CAMELIGO_SOURCE: &str = r#"
type storage = int

[@entry]
let increment (delta : int) (store : storage) : operation list * storage = [], store + delta
"#;

const SMARTPY_SOURCE: &str = r#"
import smartpy as sp

class Counter(sp.Contract):
    def __init__(self):
        self.init(value=0)
"#;

type Calls = Arc<Mutex<Vec<(String, Vec<String>)>>>;

/// Runner answering every call with `output` and recording the invocations.
fn recording_runner(output: CommandOutput) -> (MockCommandRunner, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |program, args, _| {
        sink.lock().unwrap().push((program.to_string(), args.to_vec()));
        Ok(output.clone())
    });
    (runner, calls)
}

fn write_source(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn default_registry() -> CompilerRegistry {
    let params = CompilerParams {
        ligo_binary: "ligo".to_string(),
        octez_client_binary: "octez-client".to_string(),
        smartpy_binary: "smartpy".to_string(),
        timeout: TIMEOUT,
    };
    CompilerRegistry::with_defaults(&params, Arc::new(MockCommandRunner::new()))
}

#[rstest]
#[case("token.mligo", Some(Language::CameLigo))]
#[case("token.religo", Some(Language::ReasonLigo))]
#[case("token.jsligo", Some(Language::JsLigo))]
#[case("token.ligo", Some(Language::PascaLigo))]
#[case("token.tz", Some(Language::Michelson))]
#[case("token.py", Some(Language::SmartPy))]
#[case("TOKEN.MLIGO", Some(Language::CameLigo))]
#[case("token.sol", None)]
#[case("Makefile", None)]
fn registry_resolves_languages_by_extension(#[case] file: &str, #[case] expected: Option<Language>) {
    let registry = default_registry();
    assert_eq!(registry.language_of(Path::new(file)), expected);
    assert_eq!(registry.supports(Path::new(file)), expected.is_some());
}

#[test]
fn registry_lists_every_extension() {
    assert_eq!(default_registry().supported_extensions(), vec!["jsligo", "ligo", "mligo", "py", "religo", "tz"]);
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "token.sol", "contract Token {}");
    assert_matches!(default_registry().compile(&path).await, Err(CompilerError::UnsupportedExtension(_)));
}

#[tokio::test]
async fn ligo_source_without_entrypoint_never_reaches_the_toolchain() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "token.mligo", "type storage = int");

    let mut runner = MockCommandRunner::new();
    runner.expect_run().never();
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(LigoCompiler::new("ligo", Arc::new(runner), TIMEOUT)));

    assert_matches!(
        registry.compile(&path).await,
        Err(CompilerError::ContentMismatch { language: Language::CameLigo, .. })
    );
}

#[tokio::test]
async fn ligo_compiles_and_unwraps_the_expression() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "token.mligo", CAMELIGO_SOURCE);

    let wrapped = json!({ "michelson": { "expression": script("int") } });
    let (runner, calls) = recording_runner(CommandOutput::success(wrapped.to_string()));
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(LigoCompiler::new("ligo", Arc::new(runner), TIMEOUT)));

    let compiled = registry.compile(&path).await.unwrap();
    assert_eq!(compiled.language, Language::CameLigo);
    assert_eq!(compiled.script, script("int"));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "ligo");
    let source = path.display().to_string();
    assert_eq!(calls[0].1, vec!["compile", "contract", source.as_str(), "--michelson-format", "json"]);
}

#[tokio::test]
async fn michelson_is_converted_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "token.tz", MICHELSON_SOURCE);

    let (runner, calls) = recording_runner(CommandOutput::success(script("int").to_string()));
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(MichelsonCompiler::new("octez-client", Arc::new(runner), TIMEOUT)));

    let compiled = registry.compile(&path).await.unwrap();
    assert_eq!(compiled.language, Language::Michelson);
    assert_eq!(compiled.script, script("int"));

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].1[..4], ["--mode", "mockup", "convert", "script"]);
    assert_eq!(calls[0].1[4], path.display().to_string());
}

#[tokio::test]
async fn michelson_without_code_section_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "token.tz", "parameter unit;\nstorage int;\n");

    let mut runner = MockCommandRunner::new();
    runner.expect_run().never();
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(MichelsonCompiler::new("octez-client", Arc::new(runner), TIMEOUT)));

    assert_matches!(
        registry.compile(&path).await,
        Err(CompilerError::ContentMismatch { expected, .. }) if expected.contains("code")
    );
}

#[tokio::test]
async fn nonzero_exit_carries_the_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "token.tz", MICHELSON_SOURCE);

    let (runner, _) = recording_runner(CommandOutput::failure("Ill typed contract at line 3"));
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(MichelsonCompiler::new("octez-client", Arc::new(runner), TIMEOUT)));

    assert_matches!(
        registry.compile(&path).await,
        Err(CompilerError::Toolchain { program, message })
            if program == "octez-client" && message == "Ill typed contract at line 3"
    );
}

#[tokio::test]
async fn timeout_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "token.tz", MICHELSON_SOURCE);

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .returning(|program, _, timeout| Err(CompilerError::Timeout { program: program.to_string(), timeout }));
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(MichelsonCompiler::new("octez-client", Arc::new(runner), TIMEOUT)));

    let error = registry.compile(&path).await.unwrap_err();
    assert_matches!(error, CompilerError::Timeout { timeout, .. } if timeout == TIMEOUT);
    assert!(error.to_string().contains("did not finish"));
}

#[tokio::test]
async fn smartpy_reads_the_contract_from_its_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "counter.py", SMARTPY_SOURCE);

    let mut runner = MockCommandRunner::new();
    runner.expect_run().times(1).returning(|_, args, _| {
        let target = Path::new(&args[2]).join("counter");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("step_000_cont_0_storage.json"), "0").unwrap();
        std::fs::write(target.join("step_000_cont_0_contract.json"), script("int").to_string()).unwrap();
        Ok(CommandOutput::success(""))
    });
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(SmartPyCompiler::new("smartpy", Arc::new(runner), TIMEOUT)));

    let compiled = registry.compile(&path).await.unwrap();
    assert_eq!(compiled.language, Language::SmartPy);
    assert_eq!(compiled.script, script("int"));
}

#[tokio::test]
async fn smartpy_without_output_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "counter.py", SMARTPY_SOURCE);

    let (runner, _) = recording_runner(CommandOutput::success(""));
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(SmartPyCompiler::new("smartpy", Arc::new(runner), TIMEOUT)));

    assert_matches!(registry.compile(&path).await, Err(CompilerError::MalformedOutput { .. }));
}

#[tokio::test]
async fn smartpy_requires_a_contract_class() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(dir.path(), "script.py", "print('hello')\n");

    let mut runner = MockCommandRunner::new();
    runner.expect_run().never();
    let mut registry = CompilerRegistry::new();
    registry.register(Arc::new(SmartPyCompiler::new("smartpy", Arc::new(runner), TIMEOUT)));

    assert_matches!(registry.compile(&path).await, Err(CompilerError::ContentMismatch { .. }));
}
