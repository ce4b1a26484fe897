pub mod client;
pub mod error;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;
use verifier_chain_client_interface::{ChainClient, ChainClientError, OperationInfo};

use crate::client::HttpJsonClient;
use crate::types::{ContractScriptResponse, OperationStatus, OriginationResponse, ProtocolConstantsResponse};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct TezosValidatedArgs {
    pub node_rpc_url: Url,
    pub indexer_url: Url,
    pub network: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

/// Reads contract code from a Tezos node and resolves originations through an indexer.
pub struct TezosChainClient {
    node: HttpJsonClient,
    indexer: HttpJsonClient,
    network: String,
}

impl TezosChainClient {
    pub fn new_with_args(args: &TezosValidatedArgs) -> Result<Self, ChainClientError> {
        Self::with_retry_delay(args, DEFAULT_RETRY_DELAY)
    }

    pub fn with_retry_delay(args: &TezosValidatedArgs, retry_delay: Duration) -> Result<Self, ChainClientError> {
        Ok(Self {
            node: HttpJsonClient::new(args.node_rpc_url.clone(), args.request_timeout, args.max_retries, retry_delay)?,
            indexer: HttpJsonClient::new(args.indexer_url.clone(), args.request_timeout, args.max_retries, retry_delay)?,
            network: args.network.clone(),
        })
    }
}

#[async_trait]
impl ChainClient for TezosChainClient {
    #[tracing::instrument(skip(self))]
    async fn get_code(&self, address: &str, level: Option<u64>) -> Result<serde_json::Value, ChainClientError> {
        let block = level.map(|l| l.to_string()).unwrap_or_else(|| "head".to_string());
        let url = self.node.endpoint(
            "get_code",
            &["chains", "main", "blocks", &block, "context", "contracts", address, "script"],
        )?;

        let script: ContractScriptResponse = self
            .node
            .get_json("get_code", url)
            .await?
            .ok_or_else(|| ChainClientError::ContractNotFound(address.to_string()))?;
        Ok(script.code)
    }

    #[tracing::instrument(skip(self))]
    async fn get_operation(&self, hash: &str) -> Result<Option<OperationInfo>, ChainClientError> {
        let url = self.indexer.endpoint("get_operation", &["v1", "operations", "originations", hash])?;
        let originations: Vec<OriginationResponse> =
            self.indexer.get_json("get_operation", url).await?.unwrap_or_default();

        let mut rejected = None;
        for origination in originations {
            if origination.status != OperationStatus::Applied {
                rejected.get_or_insert(origination.status);
                continue;
            }
            if let Some(contract) = origination.originated_contract {
                return Ok(Some(OperationInfo { destination_address: contract.address, network: self.network.clone() }));
            }
        }

        if let Some(status) = rejected {
            warn!(operation_hash = %hash, status = %status, "Origination was not applied");
            return Err(ChainClientError::OperationRejected { hash: hash.to_string(), status: status.to_string() });
        }
        debug!(operation_hash = %hash, "Origination not found yet");
        Ok(None)
    }

    async fn get_block_time(&self) -> Result<Duration, ChainClientError> {
        let url = self.node.endpoint("get_block_time", &["chains", "main", "blocks", "head", "context", "constants"])?;
        let constants: ProtocolConstantsResponse = self.node.get_json("get_block_time", url).await?.ok_or_else(|| {
            ChainClientError::ParseError {
                operation: "get_block_time".to_string(),
                message: "constants endpoint returned 404".to_string(),
            }
        })?;

        constants.minimal_block_delay_secs().map(Duration::from_secs).ok_or_else(|| ChainClientError::ParseError {
            operation: "get_block_time".to_string(),
            message: format!("unexpected minimal_block_delay: {}", constants.minimal_block_delay),
        })
    }

    async fn health_check(&self) -> Result<(), ChainClientError> {
        let url = self.node.endpoint("health_check", &["chains", "main", "blocks", "head", "header"])?;
        self.node
            .get_json::<serde_json::Value>("health_check", url)
            .await?
            .map(|_| ())
            .ok_or_else(|| ChainClientError::ApiError {
                operation: "health_check".to_string(),
                status: 404,
                message: format!("{} has no head block", self.node.base_url()),
            })
    }
}
