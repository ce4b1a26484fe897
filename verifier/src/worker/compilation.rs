use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::core::client::queue::QueueData;
use crate::core::config::Config;
use crate::error::{ConsumptionError, TaskError};
use crate::source::remove_task_dir;
use crate::types::task::{CompilationTask, TaskKind, TaskMessage, TaskResult, TaskStatus};
use crate::worker::comparator::structural_eq;

/// How a delivery is settled once handling is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The outcome is durable, or the message can never succeed.
    Ack,
    /// A transient failure: leave the message for redelivery.
    Nack,
}

/// Handle one delivery from the compilations queue. Never fails: every error is
/// logged and turned into a settlement so the consumer loop keeps running.
pub async fn handle_message(config: Arc<Config>, message: QueueData) {
    let settlement = match message.payload::<TaskMessage>() {
        Ok(task_message) => {
            let span = tracing::info_span!(
                "task_processing",
                task_id = task_message.id,
                kind = %task_message.kind,
                correlation_id = %Uuid::new_v4(),
            );
            handle_task(config, task_message).instrument(span).await
        }
        Err(e) => {
            let error = ConsumptionError::FailedToDecodeMessage(e.to_string());
            error!(routing_key = %message.routing_key(), error = %error, "Dropping undecodable message");
            Settlement::Ack
        }
    };

    let result = match settlement {
        Settlement::Ack => message.ack().await,
        Settlement::Nack => message.nack().await,
    };
    if let Err(e) = result {
        let error = ConsumptionError::FailedToAcknowledgeMessage(e.to_string());
        error!(settlement = ?settlement, error = %error, "Failed to settle message");
    }
}

/// Run a task to a persisted outcome and decide how to settle its message.
pub async fn handle_task(config: Arc<Config>, message: TaskMessage) -> Settlement {
    let working_dir = config.params().working_dir.clone();

    let task = match config.database().get_task(message.id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            let error = TaskError::TaskNotFound { id: message.id };
            error!(alarm = true, error = %error, "Task record is missing, dropping message");
            remove_task_dir(&working_dir, &message.dir).await;
            return Settlement::Ack;
        }
        Err(e) => {
            warn!(error = %e, "Could not load task, leaving message for redelivery");
            return Settlement::Nack;
        }
    };

    if task.kind != message.kind {
        warn!(record_kind = %task.kind, "Task kind differs from the queued message, using the message");
    }

    let processing = tokio::spawn(process_task(config.clone(), task, message.clone()).in_current_span());
    match processing.await {
        Ok(Ok(status)) => {
            info!(status = %status, "Task processed");
            remove_task_dir(&working_dir, &message.dir).await;
            Settlement::Ack
        }
        Ok(Err(e)) if e.is_transient() => {
            warn!(error = %e, "Task outcome not persisted, leaving message for redelivery");
            Settlement::Nack
        }
        Ok(Err(e)) => {
            error!(error = %e, "Task processing failed");
            remove_task_dir(&working_dir, &message.dir).await;
            Settlement::Ack
        }
        Err(join_error) => {
            let error = TaskError::Panicked { id: message.id, message: join_error.to_string() };
            error!(error = %error, "Recovered from task panic");
            if let Err(e) = config.database().update_task_status(message.id, TaskStatus::Failed).await {
                warn!(error = %e, "Could not mark panicked task as failed, leaving message for redelivery");
                return Settlement::Nack;
            }
            remove_task_dir(&working_dir, &message.dir).await;
            Settlement::Ack
        }
    }
}

/// Compile every file, compare or upload, then persist results and status in one write.
pub async fn process_task(
    config: Arc<Config>,
    task: CompilationTask,
    message: TaskMessage,
) -> Result<TaskStatus, TaskError> {
    let mut results = compile_files(&config, &task, &message).await;
    upload_artifacts(&config, &message.dir, &mut results).await;

    let status = TaskStatus::from_results(&results);
    config
        .database()
        .update_task_results(task.id, status, results)
        .await
        .map_err(|source| TaskError::Persistence { id: task.id, source })?;
    Ok(status)
}

/// One result per file, in path order. A failing file never stops its siblings.
async fn compile_files(config: &Config, task: &CompilationTask, message: &TaskMessage) -> Vec<TaskResult> {
    let mut files = message.files.clone();
    files.sort();
    files.dedup();

    let on_chain: OnceCell<Result<Value, String>> = OnceCell::new();
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file = relative_name(&message.dir, &path);
        let compiled = match config.compilers().compile(&path).await {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(file = %file, error = %e, "Compilation failed");
                results.push(TaskResult::error(file, config.compilers().language_of(&path), e.to_string()));
                continue;
            }
        };

        let result = match message.kind {
            TaskKind::Deployment => TaskResult::success(file, compiled.language, compiled.script),
            TaskKind::Verification => match on_chain.get_or_init(|| fetch_on_chain_code(config, task)).await {
                Ok(code) if structural_eq(&compiled.script, code) => {
                    TaskResult::success(file, compiled.language, compiled.script)
                }
                Ok(_) => TaskResult::mismatch(file, compiled.language, compiled.script),
                Err(e) => TaskResult::error(file, Some(compiled.language), e.clone()),
            },
        };
        debug!(file = %result.file, status = %result.status, "File processed");
        results.push(result);
    }
    results
}

async fn fetch_on_chain_code(config: &Config, task: &CompilationTask) -> Result<Value, String> {
    let address = task.address.as_deref().ok_or_else(|| "verification task has no target address".to_string())?;
    config.chain().get_code(address, None).await.map_err(|e| format!("failed to fetch on-chain code: {e}"))
}

/// Store the script of every successful result and record its location. An
/// upload failure downgrades that result to an error.
async fn upload_artifacts(config: &Config, dir: &Path, results: &mut [TaskResult]) {
    for result in results.iter_mut().filter(|r| r.status == TaskStatus::Success) {
        let Some(script) = result.script.as_ref() else { continue };
        let key = artifact_key(dir, &result.file);
        let upload = match serde_json::to_vec(script) {
            Ok(data) => config.storage().put_data(Bytes::from(data), &key).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match upload {
            Ok(location) => result.artifact = Some(location),
            Err(e) => {
                warn!(file = %result.file, key = %key, error = %e, "Artifact upload failed");
                result.status = TaskStatus::Error;
                result.error = format!("failed to upload artifact: {e}");
            }
        }
    }
}

/// Path of `file` relative to the task directory, falling back to the full path.
fn relative_name(dir: &Path, file: &Path) -> String {
    file.strip_prefix(dir).unwrap_or(file).to_string_lossy().into_owned()
}

/// `<task dir name>/<relative path>.json`
pub fn artifact_key(dir: &Path, file: &str) -> String {
    let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    format!("{}/{}.json", dir_name, file.trim_start_matches('/'))
}
