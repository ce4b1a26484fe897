use serde::Deserialize;
use strum_macros::Display;

/// `/chains/main/blocks/<block>/context/contracts/<address>/script`
#[derive(Debug, Deserialize)]
pub struct ContractScriptResponse {
    pub code: serde_json::Value,
}

/// Subset of `/chains/main/blocks/head/context/constants` the verifier cares about.
/// Nodes render the delay as a decimal string.
#[derive(Debug, Deserialize)]
pub struct ProtocolConstantsResponse {
    pub minimal_block_delay: serde_json::Value,
}

impl ProtocolConstantsResponse {
    pub fn minimal_block_delay_secs(&self) -> Option<u64> {
        match &self.minimal_block_delay {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }
}

/// Indexer view of an origination operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginationResponse {
    pub status: OperationStatus,
    pub originated_contract: Option<OriginatedContract>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationStatus {
    Applied,
    Failed,
    Backtracked,
    Skipped,
}

#[derive(Debug, Deserialize)]
pub struct OriginatedContract {
    pub address: String,
}
