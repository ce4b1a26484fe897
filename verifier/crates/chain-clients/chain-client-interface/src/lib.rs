use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Chain client gives the verifier read access to the chain a contract lives on:
/// - fetch the code currently deployed at an address (optionally at a historical level)
/// - look up a broadcast origination by its operation hash
/// - report the chain's block time, used to pace deployment reconciliation
#[automock]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Returns the Micheline JSON of the code deployed at `address`.
    /// `level` of `None` means the head block.
    async fn get_code(&self, address: &str, level: Option<u64>) -> Result<serde_json::Value, ChainClientError>;

    /// Returns `Ok(None)` while the operation is not yet included on chain, and
    /// [`ChainClientError::OperationRejected`] once it was included without being applied.
    async fn get_operation(&self, hash: &str) -> Result<Option<OperationInfo>, ChainClientError>;

    async fn get_block_time(&self) -> Result<Duration, ChainClientError>;

    async fn health_check(&self) -> Result<(), ChainClientError>;
}

/// Outcome of a confirmed origination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    pub destination_address: String,
    pub network: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    /// Transport level failures. These are worth retrying.
    #[error("Network error during {operation}: {message}")]
    NetworkError { operation: String, message: String },

    #[error("Chain API error during {operation} (status {status}): {message}")]
    ApiError { operation: String, status: u16, message: String },

    #[error("Contract {0} not found")]
    ContractNotFound(String),

    /// The operation was included but not applied. This is final.
    #[error("Operation {hash} was not applied (status {status})")]
    OperationRejected { hash: String, status: String },

    #[error("Failed to parse response during {operation}: {message}")]
    ParseError { operation: String, message: String },

    #[error("Failed to build URL for {operation}: {message}")]
    UrlError { operation: String, message: String },
}

impl ChainClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ChainClientError::NetworkError { .. } => true,
            ChainClientError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
