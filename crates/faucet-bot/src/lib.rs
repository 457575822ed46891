//! # Faucet Bot
//!
//! Chat bridge to a Pactus node: network and validator queries, plus a
//! testnet faucet that bonds a fixed stake to a requester's validator.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Duplicate-Claim Prevention
//!
//! A claim is keyed by the network peer identity of the node advertising
//! the validator address, not by the address or the chat user. One node can
//! therefore receive the faucet once, whichever address or account asks.
//!
//! | Gate | Rejection |
//! |------|-----------|
//! | Address syntax (bech32m, chain prefix) | `InvalidAddress` |
//! | Node reachable | `NodeUnreachable` |
//! | Peer advertises the address with a key | `PeerInfoUnavailable` |
//! | Peer identity not yet recorded or in flight | `AlreadyClaimed` |
//! | Peer within 1080 blocks of the tip | `NotSynced` |
//! | Faucet balance covers one payout | `InsufficientFaucetBalance` |
//!
//! ## Module Structure
//!
//! ```text
//! faucet-bot/
//! ├── domain/          # ClaimRecord, PeerInfo, Amount, address & peer-id parsing, errors
//! ├── ports/           # FaucetApi (inbound) + node, wallet and store traits (outbound)
//! ├── adapters/        # JSON-RPC node & wallet, in-memory & RocksDB stores, console
//! ├── application/     # ClaimLedger, EligibilityEngine, Dispatcher, StatusTask
//! └── config.rs        # BotConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    ConsoleTransport, InMemoryStatusStore, JsonRpcClient, RpcFaucetWallet, RpcNodeConnector,
    WalletSettings,
};
#[cfg(feature = "rocksdb")]
pub use adapters::RocksDbStatusStore;
pub use application::{
    BotContext, ClaimLedger, Dispatcher, EligibilityConfig, EligibilityEngine, Inbound, Reply,
    StatusSnapshot, StatusTask, Tone,
};
pub use config::{BotConfig, ConfigError};
pub use domain::{
    Address, Amount, Balance, ClaimRecord, FaucetError, FaucetReceipt, NodeError, PeerIdentity,
    PeerInfo, Requester, StoreError, TxHash, WalletError, MAX_SYNC_LAG,
};
pub use ports::{
    FaucetApi, FaucetWallet, MockFaucetWallet, MockNode, MockNodeConnector, NodeConnector,
    NodeQuery, StatusStore,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
