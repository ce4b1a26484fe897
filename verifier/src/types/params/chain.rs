use std::time::Duration;

use verifier_tezos_client::TezosValidatedArgs;

use crate::cli::chain::tezos::TezosCliArgs;

impl From<TezosCliArgs> for TezosValidatedArgs {
    fn from(args: TezosCliArgs) -> Self {
        Self {
            node_rpc_url: args.tezos_node_rpc_url,
            indexer_url: args.tezos_indexer_url,
            network: args.tezos_network,
            request_timeout: Duration::from_secs(args.tezos_request_timeout_seconds),
            max_retries: args.tezos_max_retries,
        }
    }
}
