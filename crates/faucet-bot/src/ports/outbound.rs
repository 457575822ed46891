//! # Outbound Ports
//!
//! Traits for external dependencies: the node, the faucet wallet and the
//! claim store.
//!
//! Production: `adapters::RpcNodeConnector`, `adapters::RpcFaucetWallet`,
//! `adapters::store::RocksDbStatusStore`.
//! Testing: `MockNodeConnector`, `MockFaucetWallet` (below) and
//! `adapters::store::InMemoryStatusStore`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    Amount, Balance, BlockchainInfo, ClaimRecord, NetworkInfo, NodeError, NodeInfo, PeerInfo,
    StoreError, TxHash, ValidatorInfo, WalletError,
};

/// Opens per-operation node connections.
///
/// A connection is owned by one logical operation and closed when dropped;
/// connections are never pooled or shared between requests.
#[async_trait]
pub trait NodeConnector: Send + Sync {
    /// Open a connection. Fails with `NodeError::Connection` when the node
    /// cannot be reached.
    async fn connect(&self) -> Result<Box<dyn NodeQuery>, NodeError>;
}

/// Read-only node queries - outbound port.
///
/// Every call is a fresh round trip; nothing is cached.
#[async_trait]
pub trait NodeQuery: Send + Sync {
    /// Height of the last committed block.
    async fn get_blockchain_height(&self) -> Result<u32, NodeError> {
        Ok(self.get_blockchain_info().await?.last_block_height)
    }

    /// Chain-wide summary.
    async fn get_blockchain_info(&self) -> Result<BlockchainInfo, NodeError>;

    /// Network summary including all connected peers.
    async fn get_network_info(&self) -> Result<NetworkInfo, NodeError>;

    /// Find the connected peer advertising `consensus_address`.
    ///
    /// The node has no index by address, so this scans every peer's address
    /// list.
    async fn get_peer_info(&self, consensus_address: &str) -> Result<PeerInfo, NodeError> {
        let network = self.get_network_info().await?;
        network
            .connected_peers
            .into_iter()
            .find(|peer| peer.has_address(consensus_address))
            .ok_or_else(|| NodeError::PeerNotFound(consensus_address.to_string()))
    }

    /// Identification of the node itself.
    async fn get_node_info(&self) -> Result<NodeInfo, NodeError>;

    /// On-chain validator record.
    async fn get_validator(&self, address: &str) -> Result<ValidatorInfo, NodeError>;

    /// Account balance.
    async fn get_account_balance(&self, address: &str) -> Result<Amount, NodeError>;
}

/// Faucet wallet - outbound port.
///
/// Transaction construction and signing stay behind this trait.
#[async_trait]
pub trait FaucetWallet: Send + Sync {
    /// Spendable balance.
    async fn get_balance(&self) -> Result<Balance, WalletError>;

    /// Bond `amount` to the validator `address` owning `public_key`.
    async fn bond_transaction(
        &self,
        public_key: &str,
        address: &str,
        amount: Amount,
    ) -> Result<TxHash, WalletError>;

    /// Address the wallet pays from.
    fn address(&self) -> &str;
}

/// Persistent claim records keyed by peer identity - outbound port.
///
/// ## Atomicity
///
/// `set_data` is insert-if-absent: of any number of concurrent calls for the
/// same peer identity exactly one succeeds, the rest get
/// `StoreError::AlreadyExists`.
pub trait StatusStore: Send + Sync {
    /// Insert a record keyed by `record.peer_identity`.
    fn set_data(&self, record: ClaimRecord) -> Result<(), StoreError>;

    /// Look up a record. No side effects.
    fn get_data(&self, peer_identity: &str) -> Result<Option<ClaimRecord>, StoreError>;

    /// Number of records.
    fn len(&self) -> Result<usize, StoreError>;

    /// True if no claims have been recorded.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock node for testing.
#[derive(Clone, Default)]
pub struct MockNode {
    /// Simulated chain summary.
    pub blockchain_info: BlockchainInfo,
    /// Simulated network view.
    pub network_info: NetworkInfo,
    /// Simulated node identification.
    pub node_info: NodeInfo,
    /// Simulated validators.
    pub validators: Vec<ValidatorInfo>,
    /// Simulated account balances.
    pub balances: HashMap<String, Amount>,
    /// Should every query fail with a connection error?
    pub should_fail: bool,
    /// Should only the height query fail?
    pub fail_height: bool,
    /// Artificial latency per query.
    pub delay: Option<Duration>,
    queries: Arc<AtomicUsize>,
}

impl MockNode {
    /// Node at `height` with the given peers.
    pub fn with_peers(height: u32, peers: Vec<PeerInfo>) -> Self {
        Self {
            blockchain_info: BlockchainInfo {
                last_block_height: height,
                ..Default::default()
            },
            network_info: NetworkInfo {
                connected_peers: peers,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Number of queries answered or failed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> Result<(), NodeError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(NodeError::Connection("Mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeQuery for MockNode {
    async fn get_blockchain_height(&self) -> Result<u32, NodeError> {
        self.begin().await?;
        if self.fail_height {
            return Err(NodeError::Connection("Mock height failure".to_string()));
        }
        Ok(self.blockchain_info.last_block_height)
    }

    async fn get_blockchain_info(&self) -> Result<BlockchainInfo, NodeError> {
        self.begin().await?;
        Ok(self.blockchain_info.clone())
    }

    async fn get_network_info(&self) -> Result<NetworkInfo, NodeError> {
        self.begin().await?;
        Ok(self.network_info.clone())
    }

    async fn get_node_info(&self) -> Result<NodeInfo, NodeError> {
        self.begin().await?;
        Ok(self.node_info.clone())
    }

    async fn get_validator(&self, address: &str) -> Result<ValidatorInfo, NodeError> {
        self.begin().await?;
        self.validators
            .iter()
            .find(|v| v.address == address)
            .cloned()
            .ok_or_else(|| NodeError::InvalidResponse(format!("validator {} not found", address)))
    }

    async fn get_account_balance(&self, address: &str) -> Result<Amount, NodeError> {
        self.begin().await?;
        Ok(self.balances.get(address).copied().unwrap_or(Amount::ZERO))
    }
}

/// Mock connector handing out clones of one `MockNode`.
#[derive(Clone, Default)]
pub struct MockNodeConnector {
    /// Node every connection talks to.
    pub node: MockNode,
    /// Should `connect` fail?
    pub refuse_connections: bool,
    connects: Arc<AtomicUsize>,
}

impl MockNodeConnector {
    /// Connector for `node`.
    pub fn new(node: MockNode) -> Self {
        Self {
            node,
            refuse_connections: false,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of connection attempts.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of queries made across all connections.
    pub fn query_count(&self) -> usize {
        self.node.query_count()
    }
}

#[async_trait]
impl NodeConnector for MockNodeConnector {
    async fn connect(&self) -> Result<Box<dyn NodeQuery>, NodeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connections {
            return Err(NodeError::Connection("Mock connection refused".to_string()));
        }
        Ok(Box::new(self.node.clone()))
    }
}

/// A bond submitted to `MockFaucetWallet`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedBond {
    /// Validator public key.
    pub public_key: String,
    /// Validator address.
    pub address: String,
    /// Bonded amount.
    pub amount: Amount,
}

/// Mock faucet wallet for testing.
#[derive(Clone)]
pub struct MockFaucetWallet {
    /// Faucet address.
    pub faucet_address: String,
    /// Spendable balance.
    pub available: Amount,
    /// Hash returned for every bond; empty simulates the failure sentinel.
    pub tx_hash: String,
    /// Should every call fail?
    pub should_fail: bool,
    /// Artificial latency per bond.
    pub delay: Option<Duration>,
    /// Error returned by every bond. An unconfirmed error still counts the
    /// bond as submitted.
    pub bond_error: Option<WalletError>,
    bonds: Arc<Mutex<Vec<RecordedBond>>>,
    balance_queries: Arc<AtomicUsize>,
}

impl Default for MockFaucetWallet {
    fn default() -> Self {
        Self {
            faucet_address: "tpc1zzyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3s6ly4d".to_string(),
            available: Amount::from_nanopac(1_000_000 * crate::domain::NANOPAC_PER_PAC),
            tx_hash: "f6f9b2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f".to_string(),
            should_fail: false,
            delay: None,
            bond_error: None,
            bonds: Arc::new(Mutex::new(Vec::new())),
            balance_queries: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockFaucetWallet {
    /// Wallet holding `available`.
    pub fn with_balance(available: Amount) -> Self {
        Self {
            available,
            ..Default::default()
        }
    }

    /// Bonds submitted so far.
    pub fn bonds(&self) -> Vec<RecordedBond> {
        self.bonds.lock().clone()
    }

    /// Number of balance queries.
    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaucetWallet for MockFaucetWallet {
    async fn get_balance(&self) -> Result<Balance, WalletError> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(WalletError::Rpc("Mock failure".to_string()));
        }
        Ok(Balance {
            available: self.available,
        })
    }

    async fn bond_transaction(
        &self,
        public_key: &str,
        address: &str,
        amount: Amount,
    ) -> Result<TxHash, WalletError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(WalletError::Rpc("Mock failure".to_string()));
        }
        let bond = RecordedBond {
            public_key: public_key.to_string(),
            address: address.to_string(),
            amount,
        };
        if let Some(e) = &self.bond_error {
            if e.outcome_unknown() {
                self.bonds.lock().push(bond);
            }
            return Err(e.clone());
        }
        self.bonds.lock().push(bond);
        TxHash::new(self.tx_hash.clone()).ok_or(WalletError::EmptyTransactionHash)
    }

    fn address(&self) -> &str {
        &self.faucet_address
    }
}
