use std::sync::Arc;

use verifier_chain_client_interface::ChainClient;
use verifier_tezos_client::{TezosChainClient, TezosValidatedArgs};

use crate::cli::RunCmd;
use crate::compiler::{CompilerRegistry, ProcessRunner};
use crate::core::client::{
    AWSS3, DatabaseClient, InMemoryQueue, MongoDbClient, QueueClient, RabbitMq, StorageClient,
};
use crate::core::cloud::CloudProvider;
use crate::core::error::VerifierCoreResult;
use crate::types::params::database::DatabaseArgs;
use crate::types::params::service::{CompilerParams, ServiceParams};
use crate::types::params::{QueueArgs, StorageArgs};
use crate::VerifierResult;

/// The app config. Built once at start-up and shared as `Arc<Config>` by the
/// worker, the reconciliation loop and the task service.
pub struct Config {
    /// Service parameters
    params: ServiceParams,
    /// Network recorded on tasks when none is given explicitly
    network: String,
    /// Queue client
    queue: Box<dyn QueueClient>,
    /// The database client
    database: Box<dyn DatabaseClient>,
    /// Storage client for compiled artifacts
    storage: Box<dyn StorageClient>,
    /// Chain client used to read deployed code and originations
    chain: Box<dyn ChainClient>,
    /// Extension to toolchain table
    compilers: CompilerRegistry,
}

impl Config {
    pub fn new(
        params: ServiceParams,
        network: String,
        queue: Box<dyn QueueClient>,
        database: Box<dyn DatabaseClient>,
        storage: Box<dyn StorageClient>,
        chain: Box<dyn ChainClient>,
        compilers: CompilerRegistry,
    ) -> Self {
        Self { params, network, queue, database, storage, chain, compilers }
    }

    /// Build every client from the command line
    pub async fn from_run_cmd(run_cmd: &RunCmd) -> VerifierResult<Self> {
        let provider = Arc::new(CloudProvider::from_run_cmd(run_cmd).await?);

        let db_args = DatabaseArgs::try_from(run_cmd.mongodb_args.clone())?;
        let storage_args = StorageArgs::try_from(run_cmd.clone())?;
        let queue_args = QueueArgs::try_from(run_cmd.clone())?;
        let tezos_args = TezosValidatedArgs::from(run_cmd.tezos_args.clone());
        let compiler_params = CompilerParams::from(run_cmd.compiler_args.clone());
        let params = ServiceParams::try_from(run_cmd.service_args.clone())?;

        let database = Self::build_database_client(&db_args).await?;
        let storage = Self::build_storage_client(&storage_args, provider.clone());
        let queue = Self::build_queue_client(&queue_args).await?;
        let chain = Self::build_chain_client(&tezos_args)?;
        let compilers = CompilerRegistry::with_defaults(&compiler_params, Arc::new(ProcessRunner));

        Ok(Self::new(params, tezos_args.network, queue, database, storage, chain, compilers))
    }

    async fn build_database_client(db_args: &DatabaseArgs) -> VerifierCoreResult<Box<dyn DatabaseClient>> {
        Ok(Box::new(MongoDbClient::new(db_args).await?))
    }

    fn build_storage_client(storage_args: &StorageArgs, provider: Arc<CloudProvider>) -> Box<dyn StorageClient> {
        Box::new(AWSS3::new(provider.get_aws_config(), storage_args))
    }

    async fn build_queue_client(queue_args: &QueueArgs) -> VerifierCoreResult<Box<dyn QueueClient>> {
        let queue: Box<dyn QueueClient> = match queue_args {
            QueueArgs::RabbitMq { broker, service } => Box::new(RabbitMq::new(broker, service).await?),
            QueueArgs::InMemory { service } => Box::new(InMemoryQueue::new(service).await?),
        };
        Ok(queue)
    }

    fn build_chain_client(tezos_args: &TezosValidatedArgs) -> VerifierCoreResult<Box<dyn ChainClient>> {
        Ok(Box::new(TezosChainClient::new_with_args(tezos_args)?))
    }

    /// Returns the service parameters
    pub fn params(&self) -> &ServiceParams {
        &self.params
    }

    /// Returns the default network
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Returns the queue provider
    pub fn queue(&self) -> &dyn QueueClient {
        self.queue.as_ref()
    }

    /// Returns the database client
    pub fn database(&self) -> &dyn DatabaseClient {
        self.database.as_ref()
    }

    /// Returns the storage provider
    pub fn storage(&self) -> &dyn StorageClient {
        self.storage.as_ref()
    }

    /// Returns the chain client
    pub fn chain(&self) -> &dyn ChainClient {
        self.chain.as_ref()
    }

    /// Returns the compiler registry
    pub fn compilers(&self) -> &CompilerRegistry {
        &self.compilers
    }

    /// Check every collaborator once; the first failure aborts start-up.
    pub async fn health_check(&self) -> VerifierCoreResult<()> {
        self.database.health_check().await?;
        self.queue.health_check().await?;
        self.storage.health_check().await?;
        self.chain.health_check().await?;
        tracing::info!("All collaborators are healthy");
        Ok(())
    }
}
