use chrono::{DateTime, SubsecRound, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// Links a broadcast origination to the task that produced its bytecode.
/// `address`/`network` stay empty until the operation is seen on chain.
/// `rejected` holds the chain status of an origination that was included but not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub task_id: u64,
    pub operation_hash: String,
    pub address: Option<String>,
    pub network: Option<String>,
    #[serde(default)]
    pub rejected: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Deployment {
    pub fn new(task_id: u64, operation_hash: impl Into<String>) -> Self {
        Self {
            task_id,
            operation_hash: operation_hash.into(),
            address: None,
            network: None,
            rejected: None,
            created_at: Utc::now().round_subsecs(0),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.address.is_none() && self.rejected.is_none()
    }
}

/// A contract whose source is proven to match its on-chain code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub task_id: u64,
    pub address: String,
    pub network: String,
    /// Storage location of the compiled artifact backing the verification.
    pub source_path: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Verification {
    pub fn new(
        task_id: u64,
        address: impl Into<String>,
        network: impl Into<String>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            address: address.into(),
            network: network.into(),
            source_path: source_path.into(),
            created_at: Utc::now().round_subsecs(0),
        }
    }
}

/// Payload of the `contracts` queue asking downstream indexers to refresh a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReindex {
    pub address: String,
    pub network: String,
}
