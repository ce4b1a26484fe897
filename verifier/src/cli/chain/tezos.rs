use clap::Args;
use url::Url;

/// Parameters used to reach the Tezos chain.
#[derive(Debug, Clone, Args)]
pub struct TezosCliArgs {
    /// Node RPC endpoint used to read deployed code and protocol constants.
    #[arg(env = "VERIFIER_TEZOS_NODE_RPC_URL", long, default_value = "http://localhost:8732")]
    pub tezos_node_rpc_url: Url,

    /// Indexer (TzKT API) endpoint used to resolve origination operations.
    #[arg(env = "VERIFIER_TEZOS_INDEXER_URL", long, default_value = "https://api.tzkt.io")]
    pub tezos_indexer_url: Url,

    /// Network name recorded on confirmed deployments.
    #[arg(env = "VERIFIER_TEZOS_NETWORK", long, default_value = "mainnet")]
    pub tezos_network: String,

    #[arg(env = "VERIFIER_TEZOS_REQUEST_TIMEOUT_SECONDS", long, default_value = "10")]
    pub tezos_request_timeout_seconds: u64,

    /// How many times a transient RPC failure is retried before giving up.
    #[arg(env = "VERIFIER_TEZOS_MAX_RETRIES", long, default_value = "3")]
    pub tezos_max_retries: u32,
}
