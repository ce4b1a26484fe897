use color_eyre::eyre::{eyre, WrapErr};
use tracing::{debug, error, info, warn};
use verifier_chain_client_interface::{ChainClientError, OperationInfo};

use crate::core::config::Config;
use crate::types::deployment::{ContractReindex, Deployment, Verification};
use crate::types::queue::QueueType;

/// One reconciliation pass: promote every pending deployment whose origination is
/// now visible on chain. Deployments not found yet are left for the next pass, while
/// originations the chain did not apply are closed out as rejected.
/// Returns how many deployments were confirmed.
pub async fn reconcile_deployments(config: &Config) -> color_eyre::Result<usize> {
    let pending = config.database().get_pending_deployments().await.wrap_err("Failed to list pending deployments")?;
    debug!(pending = pending.len(), "Reconciling deployments");

    let mut confirmed = 0;
    for deployment in pending {
        match config.chain().get_operation(&deployment.operation_hash).await {
            Ok(Some(operation)) => match confirm_deployment(config, &deployment, &operation).await {
                Ok(()) => confirmed += 1,
                Err(e) => error!(
                    operation_hash = %deployment.operation_hash,
                    task_id = deployment.task_id,
                    error = %e,
                    error_chain = ?e,
                    "Failed to confirm deployment"
                ),
            },
            Ok(None) => {
                debug!(operation_hash = %deployment.operation_hash, "Origination not on chain yet");
            }
            Err(ChainClientError::OperationRejected { status, .. }) => {
                warn!(
                    operation_hash = %deployment.operation_hash,
                    task_id = deployment.task_id,
                    status = %status,
                    "Origination was not applied, closing out the deployment"
                );
                if let Err(e) = config.database().reject_deployment(&deployment.operation_hash, &status).await {
                    error!(operation_hash = %deployment.operation_hash, error = %e, "Failed to reject deployment");
                }
            }
            Err(e) => {
                warn!(operation_hash = %deployment.operation_hash, error = %e, "Failed to look up origination");
            }
        }
    }

    if confirmed > 0 {
        info!(confirmed, "Deployments confirmed");
    }
    Ok(confirmed)
}

/// The deployment record is written last, so a failure in any earlier step keeps
/// it pending and the whole confirmation is retried on the next pass.
async fn confirm_deployment(
    config: &Config,
    deployment: &Deployment,
    operation: &OperationInfo,
) -> color_eyre::Result<()> {
    let address = operation.destination_address.as_str();
    let network = operation.network.as_str();

    let task = config
        .database()
        .get_task(deployment.task_id)
        .await?
        .ok_or_else(|| eyre!("Task {} of deployment {} not found", deployment.task_id, deployment.operation_hash))?;

    config.database().set_task_address(task.id, address, network).await?;

    match task.first_success_artifact() {
        Some(artifact) => {
            config.database().upsert_verification(Verification::new(task.id, address, network, artifact)).await?;
        }
        None => warn!(task_id = task.id, "Deployed task has no compiled artifact, skipping verification record"),
    }

    let reindex = ContractReindex { address: address.to_string(), network: network.to_string() };
    config.queue().send_raw(QueueType::Contracts, serde_json::to_vec(&reindex)?).await?;

    config.database().update_deployment(&deployment.operation_hash, address, network).await?;
    info!(operation_hash = %deployment.operation_hash, address = %address, network = %network, "Deployment confirmed");
    Ok(())
}
