use tracing::{debug, info};

use crate::cli::SetupCmd;
use crate::core::client::{MongoDbClient, RabbitMq, AWSS3};
use crate::core::cloud::CloudProvider;
use crate::types::params::database::DatabaseArgs;
use crate::types::params::{RabbitMqArgs, StorageArgs};
use crate::{VerifierError, VerifierResult};

/// Create every external resource the verifier needs. Each step is idempotent,
/// so running setup against existing infrastructure is harmless.
pub async fn setup(setup_cmd: &SetupCmd) -> VerifierResult<()> {
    let cloud_provider = CloudProvider::from_setup_cmd(setup_cmd).await?;
    info!(provider = %cloud_provider.get_provider_name(), "Setting up resources for the verifier");

    let storage_args = StorageArgs::try_from(setup_cmd.clone())?;
    let broker_args = RabbitMqArgs::try_from(setup_cmd.rabbitmq_args.clone())?;
    let db_args = DatabaseArgs::try_from(setup_cmd.mongodb_args.clone())?;
    debug!(storage = ?storage_args, broker = ?broker_args, services = ?setup_cmd.services, "Setup parameters");

    if setup_cmd.services.is_empty() {
        return Err(VerifierError::SetupCommandError("At least one service must be given".to_string()));
    }

    AWSS3::new(cloud_provider.get_aws_config(), &storage_args)
        .create_bucket()
        .await
        .map_err(|e| VerifierError::ResourceSetupError(format!("storage: {e}")))?;

    RabbitMq::without_topology(&broker_args, &setup_cmd.services[0])
        .declare_topology(&setup_cmd.services)
        .await
        .map_err(|e| VerifierError::ResourceSetupError(format!("queue: {e}")))?;

    MongoDbClient::new(&db_args)
        .await?
        .create_indexes()
        .await
        .map_err(|e| VerifierError::ResourceSetupError(format!("database: {e}")))?;

    info!("Resources set up");
    Ok(())
}
