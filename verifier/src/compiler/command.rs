use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::error::CompilerError;

/// Outcome of a finished toolchain invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output of the process.
    pub output: String,
    /// Set when the process exited unsuccessfully; holds its diagnostics.
    pub exit_error: Option<String>,
}

impl CommandOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self { output: output.into(), exit_error: None }
    }

    pub fn failure(diagnostics: impl Into<String>) -> Self {
        Self { output: String::new(), exit_error: Some(diagnostics.into()) }
    }
}

/// Runs an external program to completion under a deadline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Spawn failures and timeouts are errors; a nonzero exit is reported through
    /// [`CommandOutput::exit_error`].
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput, CompilerError>;
}

/// [`CommandRunner`] backed by real child processes. The child is killed if the
/// deadline passes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput, CompilerError> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        tracing::debug!(program = %program, args = ?args, "Running toolchain");
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| CompilerError::Timeout { program: program.to_string(), timeout })?
            .map_err(|source| CompilerError::Spawn { program: program.to_string(), source })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(CommandOutput::success(stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = match (stderr.trim(), stdout.trim()) {
            ("", "") => format!("exited with {}", output.status),
            ("", out) => out.to_string(),
            (err, "") => err.to_string(),
            (err, out) => format!("{err}\n{out}"),
        };
        Ok(CommandOutput { output: stdout, exit_error: Some(diagnostics) })
    }
}

/// Turn a finished invocation into a Micheline JSON document.
pub(crate) fn parse_script(program: &str, output: CommandOutput) -> Result<serde_json::Value, CompilerError> {
    if let Some(message) = output.exit_error {
        return Err(CompilerError::Toolchain { program: program.to_string(), message });
    }
    serde_json::from_str(output.output.trim())
        .map_err(|e| CompilerError::MalformedOutput { program: program.to_string(), message: e.to_string() })
}
