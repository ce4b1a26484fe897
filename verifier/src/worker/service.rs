use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::compiler::CompilerRegistry;
use crate::core::client::queue::QueueClientExt;
use crate::core::config::Config;
use crate::error::TaskError;
use crate::source::archive::GithubArchive;
use crate::source::upload::{persist_uploads, UploadedFile};
use crate::source::{remove_task_dir, AcquisitionError, TaskDir};
use crate::types::deployment::Deployment;
use crate::types::task::{CompilationTask, NewTask, TaskKind, TaskMessage, TaskSource, TaskStatus};
use crate::{VerifierError, VerifierResult};

/// Who asked for what; the sources are passed separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user_id: Option<String>,
    pub kind: TaskKind,
    pub address: Option<String>,
    pub network: Option<String>,
}

/// Strategy materializing a task's sources into its directory.
enum Acquisition<'a> {
    Upload(&'a [UploadedFile]),
    Repository { archive: GithubArchive, owner: &'a str, repo: &'a str, reference: &'a str },
}

impl Acquisition<'_> {
    async fn run(&self, dir: &TaskDir, compilers: &CompilerRegistry) -> Result<Vec<PathBuf>, AcquisitionError> {
        match self {
            Acquisition::Upload(files) => persist_uploads(dir, files, compilers).await,
            Acquisition::Repository { archive, owner, repo, reference } => {
                archive.fetch(owner, repo, reference, dir, compilers).await
            }
        }
    }
}

/// Producer side of the pipeline: creates tasks, materializes their sources and
/// enqueues them for the worker.
pub struct TaskService;

impl TaskService {
    /// Submit uploaded files. An unsupported file fails the task and nothing is queued.
    pub async fn submit_files(
        config: &Config,
        submission: Submission,
        files: Vec<UploadedFile>,
    ) -> VerifierResult<CompilationTask> {
        let source = TaskSource::Upload { files: files.iter().map(|f| f.name.clone()).collect() };
        Self::submit(config, submission, source, Acquisition::Upload(&files)).await
    }

    /// Submit the repository `owner/repo` at `reference`, fetched as an archive.
    pub async fn submit_repository(
        config: &Config,
        submission: Submission,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> VerifierResult<CompilationTask> {
        let params = config.params();
        let archive = GithubArchive::new(params.archive_base_url.clone(), params.archive_timeout)?;
        let source = TaskSource::Repository {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: reference.to_string(),
        };
        Self::submit(config, submission, source, Acquisition::Repository { archive, owner, repo, reference }).await
    }

    /// Record the broadcast origination of a deployment task, to be confirmed by reconciliation.
    pub async fn register_deployment(
        config: &Config,
        task_id: u64,
        operation_hash: &str,
    ) -> VerifierResult<Deployment> {
        let task = config.database().get_task(task_id).await?.ok_or(TaskError::TaskNotFound { id: task_id })?;
        if task.kind != TaskKind::Deployment {
            return Err(TaskError::InvalidSubmission(format!("task {} is not a deployment", task_id)).into());
        }
        if task.status != TaskStatus::Success {
            warn!(task_id, status = %task.status, "Registering a deployment for a task that did not succeed");
        }

        let deployment = config.database().create_deployment(Deployment::new(task_id, operation_hash)).await?;
        info!(task_id, operation_hash = %operation_hash, "Deployment registered");
        Ok(deployment)
    }

    async fn submit(
        config: &Config,
        submission: Submission,
        source: TaskSource,
        acquisition: Acquisition<'_>,
    ) -> VerifierResult<CompilationTask> {
        let new_task = Self::new_task(config, submission, source)?;
        let task = config.database().create_task(new_task).await?;
        info!(task_id = task.id, kind = %task.kind, "Task created");

        // Dropping the directory on any failure below removes it with its contents.
        let dir = match TaskDir::create(&config.params().working_dir) {
            Ok(dir) => dir,
            Err(e) => return Err(Self::fail(config, &task, e.into()).await),
        };
        let files = match acquisition.run(&dir, config.compilers()).await {
            Ok(files) => files,
            Err(e) => return Err(Self::fail(config, &task, e.into()).await),
        };

        let message = TaskMessage { id: task.id, kind: task.kind, files, dir: dir.keep() };
        if let Err(source) = config.queue().send(&message).await {
            remove_task_dir(&config.params().working_dir, &message.dir).await;
            return Err(Self::fail(config, &task, TaskError::Enqueue { id: task.id, source }.into()).await);
        }

        info!(task_id = task.id, files = message.files.len(), "Task queued");
        Ok(task)
    }

    fn new_task(config: &Config, submission: Submission, source: TaskSource) -> VerifierResult<NewTask> {
        let (address, network) = match submission.kind {
            TaskKind::Verification => {
                let address = submission.address.filter(|a| !a.is_empty()).ok_or_else(|| {
                    TaskError::InvalidSubmission("verification requires a contract address".to_string())
                })?;
                (Some(address), Some(submission.network.unwrap_or_else(|| config.network().to_string())))
            }
            TaskKind::Deployment => (None, None),
        };
        Ok(NewTask { user_id: submission.user_id, kind: submission.kind, address, network, source: Some(source) })
    }

    /// Mark the task failed and hand back the error that caused it.
    async fn fail(config: &Config, task: &CompilationTask, cause: VerifierError) -> VerifierError {
        warn!(task_id = task.id, error = %cause, "Task failed before it was queued");
        if let Err(e) = config.database().update_task_status(task.id, TaskStatus::Failed).await {
            error!(task_id = task.id, error = %e, "Could not mark task as failed");
        }
        cause
    }
}
