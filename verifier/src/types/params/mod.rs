pub mod chain;
pub mod cloud_provider;
pub mod database;
pub mod service;

use crate::cli::queue::rabbitmq::RabbitMQCliArgs;
use crate::cli::{RunCmd, SetupCmd};
use crate::VerifierError;

/// StorageArgs - Arguments used to setup storage resources
#[derive(Debug, Clone)]
pub struct StorageArgs {
    pub bucket_identifier: String,
}

/// RabbitMqArgs - Arguments used to reach the broker and name the topology
#[derive(Debug, Clone)]
pub struct RabbitMqArgs {
    pub url: String,
    pub exchange: String,
    pub prefetch: u16,
}

/// QueueArgs - Which broker backend to build, selected once at start-up
#[derive(Debug, Clone)]
pub enum QueueArgs {
    RabbitMq { broker: RabbitMqArgs, service: String },
    InMemory { service: String },
}

impl TryFrom<RabbitMQCliArgs> for RabbitMqArgs {
    type Error = VerifierError;
    fn try_from(args: RabbitMQCliArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            url: args
                .rabbitmq_url
                .ok_or_else(|| VerifierError::ConfigError("RabbitMQ url is required".to_string()))?,
            exchange: args.rabbitmq_exchange,
            prefetch: args.rabbitmq_prefetch,
        })
    }
}

/// NOTE: The following implementations validate the command line arguments
/// and convert them to the respective argument structs.
impl TryFrom<RunCmd> for StorageArgs {
    type Error = VerifierError;
    fn try_from(run_cmd: RunCmd) -> Result<Self, Self::Error> {
        Ok(Self {
            bucket_identifier: run_cmd
                .aws_s3_args
                .bucket_identifier
                .ok_or_else(|| VerifierError::ConfigError("Bucket identifier is required".to_string()))?,
        })
    }
}

impl TryFrom<SetupCmd> for StorageArgs {
    type Error = VerifierError;
    fn try_from(setup_cmd: SetupCmd) -> Result<Self, Self::Error> {
        Ok(Self {
            bucket_identifier: setup_cmd
                .aws_s3_args
                .bucket_identifier
                .ok_or_else(|| VerifierError::SetupCommandError("Bucket identifier is required".to_string()))?,
        })
    }
}

impl TryFrom<RunCmd> for QueueArgs {
    type Error = VerifierError;
    fn try_from(run_cmd: RunCmd) -> Result<Self, Self::Error> {
        let service = run_cmd.service_args.service_name.clone();
        match (run_cmd.rabbitmq_args.rabbitmq, run_cmd.in_memory_queue_args.in_memory_queue) {
            (true, false) => Ok(Self::RabbitMq { broker: run_cmd.rabbitmq_args.try_into()?, service }),
            (false, true) => Ok(Self::InMemory { service }),
            _ => Err(VerifierError::ConfigError("Exactly one queue backend must be selected".to_string())),
        }
    }
}
