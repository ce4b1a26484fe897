use thiserror::Error;

use super::client::{database::DatabaseError, queue::QueueError, storage::StorageError};

pub type VerifierCoreResult<T> = Result<T, VerifierCoreError>;

#[derive(Error, Debug)]
pub enum VerifierCoreError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Queue error: {0}")]
    QueueError(#[from] QueueError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Chain client error: {0}")]
    ChainClientError(#[from] verifier_chain_client_interface::ChainClientError),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),
}
