pub mod consumer;
pub mod task;

use thiserror::Error;

use crate::core::client::database::DatabaseError;
use crate::core::client::queue::QueueError;
use crate::core::client::storage::StorageError;
use crate::core::error::VerifierCoreError;
use crate::source::AcquisitionError;
pub use consumer::ConsumptionError;
pub use task::TaskError;
use verifier_chain_client_interface::ChainClientError;

/// Result type for verifier operations
pub type VerifierResult<T> = Result<T, VerifierError>;

/// Error types for the verifier service
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Queue error: {0}")]
    QueueError(#[from] QueueError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Chain client error: {0}")]
    ChainClientError(#[from] ChainClientError),

    #[error("Verifier Core Error: {0}")]
    VerifierCoreError(#[from] VerifierCoreError),

    #[error("Source acquisition error: {0}")]
    AcquisitionError(#[from] AcquisitionError),

    #[error("Task error: {0}")]
    TaskError(#[from] TaskError),

    #[error("ConsumptionError: {0}")]
    ConsumptionError(#[from] ConsumptionError),

    /// Setup Command error
    #[error("Setup Command Error: {0}")]
    SetupCommandError(String),

    /// Run Command error
    #[error("Run Command Error: {0}")]
    RunCommandError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Resource Setup error
    #[error("Resource setup error: {0}")]
    ResourceSetupError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
