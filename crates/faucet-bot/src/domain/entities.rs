//! # Domain Entities
//!
//! Claim records persisted by the status store, and the transient views of
//! node state returned by the Node Query Facade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::Amount;

/// A faucet claim, keyed by peer identity.
///
/// Created once on the first successful dispense for a peer and never
/// modified or deleted afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Peer identity (unique key).
    pub peer_identity: String,
    /// Address that received the bond.
    pub validator_address: String,
    /// Chat username of the requester.
    pub requester_username: String,
    /// Chat user id of the requester.
    pub requester_user_id: String,
    /// Amount bonded.
    pub amount: Amount,
    /// When the claim was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A connected peer as reported by the node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerInfo {
    /// Raw libp2p identity bytes (multihash).
    pub peer_id: Vec<u8>,
    /// Last block height the peer reported.
    pub sync_height: u32,
    /// Consensus (validator) addresses run by the peer.
    pub consensus_addresses: Vec<String>,
    /// Public keys, index-aligned with `consensus_addresses`.
    pub consensus_keys: Vec<String>,
    /// Node moniker.
    pub moniker: String,
    /// Node software agent string.
    pub agent: String,
}

impl PeerInfo {
    /// True if the peer advertises `address`.
    pub fn has_address(&self, address: &str) -> bool {
        self.consensus_addresses
            .iter()
            .any(|addr| !addr.is_empty() && addr == address)
    }

    /// Public key paired with `address`, if the peer reports one.
    pub fn public_key_for(&self, address: &str) -> Option<&str> {
        let index = self
            .consensus_addresses
            .iter()
            .position(|addr| !addr.is_empty() && addr == address)?;
        self.consensus_keys
            .get(index)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }
}

/// Chain-wide summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockchainInfo {
    /// Height of the last committed block.
    pub last_block_height: u32,
    /// Total stake.
    pub total_power: Amount,
    /// Stake held by the current committee.
    pub committee_power: Amount,
    /// Number of validators.
    pub total_validators: u32,
}

/// Network-wide summary from the node's point of view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Unix seconds when the node's network layer started.
    pub started_at: i64,
    /// Bytes sent.
    pub total_sent_bytes: u64,
    /// Bytes received.
    pub total_received_bytes: u64,
    /// Connected peers.
    pub connected_peers: Vec<PeerInfo>,
}

/// Identification of the node the bot talks to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeInfo {
    /// Node moniker.
    pub moniker: String,
    /// Node software agent string.
    pub agent: String,
    /// Hex encoded peer id.
    pub peer_id: String,
}

/// A validator registered on chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidatorInfo {
    /// Validator address.
    pub address: String,
    /// Validator public key.
    pub public_key: String,
    /// Sequence number.
    pub number: i32,
    /// Bonded stake.
    pub stake: Amount,
    /// Height of the last bond.
    pub last_bonding_height: u32,
    /// Height of the last sortition win.
    pub last_sortition_height: u32,
    /// Availability score in `[0, 1]`.
    pub availability_score: f64,
}

/// Spendable balance of the faucet wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balance {
    /// Spendable amount.
    pub available: Amount,
}
