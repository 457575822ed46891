//! Node Query Facade over the node's JSON-RPC API.
//!
//! Implements `NodeConnector` and `NodeQuery`. Each `connect` builds a fresh
//! HTTP client; dropping the returned handle closes its connections.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::rpc::{lenient_i64, JsonRpcClient};
use crate::domain::{
    Amount, BlockchainInfo, NetworkInfo, NodeError, NodeInfo, PeerInfo, ValidatorInfo,
};
use crate::ports::outbound::{NodeConnector, NodeQuery};

const GET_BLOCKCHAIN_INFO: &str = "pactus.blockchain.get_blockchain_info";
const GET_NETWORK_INFO: &str = "pactus.network.get_network_info";
const GET_NODE_INFO: &str = "pactus.network.get_node_info";
const GET_VALIDATOR: &str = "pactus.blockchain.get_validator";
const GET_ACCOUNT: &str = "pactus.blockchain.get_account";

// -----------------------------------------------------------------------------
// Wire types
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BlockchainInfoResponse {
    #[serde(default)]
    last_block_height: u32,
    #[serde(default)]
    total_validators: u32,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_power: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    committee_power: i64,
}

#[derive(Debug, Deserialize)]
struct NetworkInfoResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    started_at: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_sent_bytes: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_received_bytes: i64,
    #[serde(default, alias = "peers")]
    connected_peers: Vec<WirePeerInfo>,
}

#[derive(Debug, Deserialize)]
struct WirePeerInfo {
    #[serde(default)]
    peer_id: String,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    moniker: String,
    #[serde(default)]
    agent: String,
    #[serde(default)]
    consensus_keys: Vec<String>,
    #[serde(default, alias = "consensus_address")]
    consensus_addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NodeInfoResponse {
    #[serde(default)]
    moniker: String,
    #[serde(default)]
    agent: String,
    #[serde(default)]
    peer_id: String,
}

#[derive(Debug, Deserialize)]
struct ValidatorResponse {
    validator: WireValidator,
}

#[derive(Debug, Deserialize)]
struct WireValidator {
    #[serde(default)]
    address: String,
    #[serde(default)]
    public_key: String,
    #[serde(default)]
    number: i32,
    #[serde(default, deserialize_with = "lenient_i64")]
    stake: i64,
    #[serde(default)]
    last_bonding_height: u32,
    #[serde(default)]
    last_sortition_height: u32,
    #[serde(default)]
    availability_score: f64,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: WireAccount,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    #[serde(default, deserialize_with = "lenient_i64")]
    balance: i64,
}

/// Peer ids arrive hex encoded; older nodes send the libp2p base58 text form.
fn decode_peer_id(raw: &str) -> Vec<u8> {
    if raw.is_empty() {
        return Vec::new();
    }
    hex::decode(raw)
        .or_else(|_| bs58::decode(raw).into_vec())
        .unwrap_or_default()
}

impl From<WirePeerInfo> for PeerInfo {
    fn from(wire: WirePeerInfo) -> Self {
        PeerInfo {
            peer_id: decode_peer_id(&wire.peer_id),
            sync_height: wire.height,
            consensus_addresses: wire.consensus_addresses,
            consensus_keys: wire.consensus_keys,
            moniker: wire.moniker,
            agent: wire.agent,
        }
    }
}

impl From<NetworkInfoResponse> for NetworkInfo {
    fn from(wire: NetworkInfoResponse) -> Self {
        NetworkInfo {
            started_at: wire.started_at,
            total_sent_bytes: u64::try_from(wire.total_sent_bytes).unwrap_or(0),
            total_received_bytes: u64::try_from(wire.total_received_bytes).unwrap_or(0),
            connected_peers: wire.connected_peers.into_iter().map(PeerInfo::from).collect(),
        }
    }
}

impl From<BlockchainInfoResponse> for BlockchainInfo {
    fn from(wire: BlockchainInfoResponse) -> Self {
        BlockchainInfo {
            last_block_height: wire.last_block_height,
            total_power: Amount::from_signed_nanopac(wire.total_power),
            committee_power: Amount::from_signed_nanopac(wire.committee_power),
            total_validators: wire.total_validators,
        }
    }
}

impl From<WireValidator> for ValidatorInfo {
    fn from(wire: WireValidator) -> Self {
        ValidatorInfo {
            address: wire.address,
            public_key: wire.public_key,
            number: wire.number,
            stake: Amount::from_signed_nanopac(wire.stake),
            last_bonding_height: wire.last_bonding_height,
            last_sortition_height: wire.last_sortition_height,
            availability_score: wire.availability_score,
        }
    }
}

// -----------------------------------------------------------------------------
// Connector
// -----------------------------------------------------------------------------

/// Opens JSON-RPC connections to one node endpoint.
#[derive(Clone, Debug)]
pub struct RpcNodeConnector {
    endpoint: String,
    request_timeout: Duration,
    connect_timeout: Duration,
}

impl RpcNodeConnector {
    /// Create a connector.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout,
            connect_timeout,
        }
    }

    /// Configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NodeConnector for RpcNodeConnector {
    async fn connect(&self) -> Result<Box<dyn NodeQuery>, NodeError> {
        let client = RpcNodeClient::connect(&self.endpoint, self.request_timeout, self.connect_timeout)?;
        Ok(Box::new(client))
    }
}

/// One JSON-RPC connection to the node.
pub struct RpcNodeClient {
    rpc: JsonRpcClient,
}

impl RpcNodeClient {
    /// Open a connection to `endpoint`.
    pub fn connect(
        endpoint: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, NodeError> {
        let rpc = JsonRpcClient::new(endpoint, request_timeout, connect_timeout)?;
        info!("[node] establishing new connection to {}", endpoint);
        Ok(Self { rpc })
    }
}

impl Drop for RpcNodeClient {
    fn drop(&mut self) {
        debug!("[node] closing connection to {}", self.rpc.endpoint());
    }
}

#[async_trait]
impl NodeQuery for RpcNodeClient {
    async fn get_blockchain_info(&self) -> Result<BlockchainInfo, NodeError> {
        let info: BlockchainInfoResponse = self.rpc.call(GET_BLOCKCHAIN_INFO, json!({})).await?;
        Ok(info.into())
    }

    async fn get_network_info(&self) -> Result<NetworkInfo, NodeError> {
        let info: NetworkInfoResponse = self.rpc.call(GET_NETWORK_INFO, json!({})).await?;
        Ok(info.into())
    }

    async fn get_node_info(&self) -> Result<NodeInfo, NodeError> {
        let info: NodeInfoResponse = self.rpc.call(GET_NODE_INFO, json!({})).await?;
        Ok(NodeInfo {
            moniker: info.moniker,
            agent: info.agent,
            peer_id: info.peer_id,
        })
    }

    async fn get_validator(&self, address: &str) -> Result<ValidatorInfo, NodeError> {
        let response: ValidatorResponse = self
            .rpc
            .call(GET_VALIDATOR, json!({ "address": address }))
            .await?;
        Ok(response.validator.into())
    }

    async fn get_account_balance(&self, address: &str) -> Result<Amount, NodeError> {
        let response: AccountResponse = self
            .rpc
            .call(GET_ACCOUNT, json!({ "address": address }))
            .await?;
        Ok(Amount::from_signed_nanopac(response.account.balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK_INFO: &str = r#"{
        "network_name": "testnet",
        "started_at": "1700000000",
        "total_sent_bytes": "1024",
        "total_received_bytes": 2048,
        "connected_peers": [
            {
                "peer_id": "1220000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
                "height": 4200,
                "moniker": "alice",
                "consensus_keys": ["public1abc"],
                "consensus_addresses": ["tpc1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl"]
            }
        ]
    }"#;

    #[test]
    fn test_network_info_conversion() {
        let wire: NetworkInfoResponse = serde_json::from_str(NETWORK_INFO).unwrap();
        let info = NetworkInfo::from(wire);
        assert_eq!(info.started_at, 1_700_000_000);
        assert_eq!(info.total_sent_bytes, 1024);
        assert_eq!(info.total_received_bytes, 2048);
        assert_eq!(info.connected_peers.len(), 1);

        let peer = &info.connected_peers[0];
        assert_eq!(peer.sync_height, 4200);
        assert_eq!(peer.peer_id.len(), 34);
        assert_eq!(
            peer.public_key_for("tpc1pxl333elgnrdtk0kjpjdvky44yu62x0cwupnpjl"),
            Some("public1abc")
        );
    }

    #[test]
    fn test_legacy_field_names() {
        let raw = r#"{"peers": [{"peer_id": "QmNLfbof5rLekrACjeuLk9JmGZD2HDBHCU4z16iYKmx5SE", "consensus_address": ["tpc1a"]}]}"#;
        let info = NetworkInfo::from(serde_json::from_str::<NetworkInfoResponse>(raw).unwrap());
        assert_eq!(info.connected_peers[0].consensus_addresses, vec!["tpc1a"]);
        assert_eq!(info.connected_peers[0].peer_id[..2], [0x12, 0x20]);
    }

    #[test]
    fn test_blockchain_info_conversion() {
        let raw = r#"{"last_block_height": 1500, "total_validators": 42, "total_power": "5000000000000", "committee_power": "1000000000"}"#;
        let info = BlockchainInfo::from(serde_json::from_str::<BlockchainInfoResponse>(raw).unwrap());
        assert_eq!(info.last_block_height, 1500);
        assert_eq!(info.total_validators, 42);
        assert_eq!(info.total_power, Amount::from_nanopac(5_000_000_000_000));
        assert_eq!(info.committee_power.to_string(), "1.000000 PAC");
    }

    #[test]
    fn test_undecodable_peer_id_is_empty() {
        assert!(decode_peer_id("not-an-id!").is_empty());
        assert!(decode_peer_id("").is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_connection_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let connector = RpcNodeConnector::new(
            "http://127.0.0.1:9",
            Duration::from_millis(500),
            Duration::from_millis(200),
        );
        let node = connector.connect().await.unwrap();
        assert!(matches!(
            node.get_blockchain_height().await,
            Err(NodeError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_endpoint_fails_connect() {
        let connector = RpcNodeConnector::new("::", Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(
            connector.connect().await,
            Err(NodeError::Connection(_))
        ));
    }
}
