use std::sync::Arc;

use clap::Parser as _;
use contract_verifier::cli::{Cli, Commands, RegisterDeploymentCmd, RunCmd, SetupCmd, SubmitCmd};
use contract_verifier::core::config::Config;
use contract_verifier::error::TaskError;
use contract_verifier::setup::setup;
use contract_verifier::source::upload::UploadedFile;
use contract_verifier::types::constant::VERIFIER_VERSION;
use contract_verifier::utils::logging::init_logging;
use contract_verifier::worker::service::{Submission, TaskService};
use contract_verifier::worker::WorkerController;
use contract_verifier::{VerifierError, VerifierResult};
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();
    info!(version = VERIFIER_VERSION, "Starting contract verifier");
    let cli = Cli::parse();

    let (command, result) = match &cli.command {
        Commands::Run { run_command } => ("run", run_verifier(run_command).await),
        Commands::Setup { setup_command } => ("setup", setup_verifier(setup_command).await),
        Commands::Submit { submit_command } => ("submit", submit_task(submit_command).await),
        Commands::RegisterDeployment { register_command } => {
            ("register-deployment", register_deployment(register_command).await)
        }
    };

    match result {
        Ok(()) => info!(command, "Command completed successfully"),
        Err(e) => {
            error!(command, error = %e, error_chain = ?e, "Command failed");
            std::process::exit(1);
        }
    }
}

async fn run_verifier(run_cmd: &RunCmd) -> VerifierResult<()> {
    let config = Arc::new(Config::from_run_cmd(run_cmd).await?);
    debug!("Configuration initialized");
    config.health_check().await?;

    let controller = WorkerController::new(config.clone(), CancellationToken::new());
    let worker = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run().await }
    });

    tokio::signal::ctrl_c().await?;
    controller.shutdown();

    worker.await.map_err(|e| VerifierError::RunCommandError(format!("worker task failed: {e}")))??;
    info!("Verifier shut down");
    Ok(())
}

async fn setup_verifier(setup_cmd: &SetupCmd) -> VerifierResult<()> {
    setup(setup_cmd).await
}

async fn submit_task(submit_cmd: &SubmitCmd) -> VerifierResult<()> {
    let config = Config::from_run_cmd(&submit_cmd.run_args).await?;
    let submission = Submission {
        user_id: submit_cmd.user_id.clone(),
        kind: submit_cmd.kind,
        address: submit_cmd.address.clone(),
        network: submit_cmd.network.clone(),
    };

    let task = match &submit_cmd.repository {
        Some(repository) => {
            let (owner, repo) = repository.split_once('/').ok_or_else(|| {
                TaskError::InvalidSubmission(format!("repository must be `owner/repo`, got {repository:?}"))
            })?;
            TaskService::submit_repository(&config, submission, owner, repo, &submit_cmd.reference).await?
        }
        None => {
            let mut files = Vec::with_capacity(submit_cmd.files.len());
            for path in &submit_cmd.files {
                files.push(UploadedFile::from_path(path).await?);
            }
            TaskService::submit_files(&config, submission, files).await?
        }
    };

    info!(task_id = task.id, kind = %task.kind, "Task submitted");
    Ok(())
}

async fn register_deployment(register_cmd: &RegisterDeploymentCmd) -> VerifierResult<()> {
    let config = Config::from_run_cmd(&register_cmd.run_args).await?;
    TaskService::register_deployment(&config, register_cmd.task_id, &register_cmd.operation_hash).await?;
    Ok(())
}
