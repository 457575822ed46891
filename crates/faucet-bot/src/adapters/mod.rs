//! # Adapters
//!
//! Port implementations for production use.
//!
//! - `rpc` - JSON-RPC 2.0 transport shared by the node and wallet adapters
//! - `rpc_node` - `NodeConnector` / `NodeQuery` over the node's JSON-RPC API
//! - `rpc_wallet` - `FaucetWallet` backed by the node's wallet service
//! - `store` - in-memory and RocksDB `StatusStore` backends
//! - `console` - line-based chat transport for local operation

pub mod console;
pub mod rpc;
pub mod rpc_node;
pub mod rpc_wallet;
pub mod store;

pub use console::{format_reply, parse_line, ConsoleTransport};
pub use rpc::{JsonRpcClient, RpcError};
pub use rpc_node::{RpcNodeClient, RpcNodeConnector};
pub use rpc_wallet::{RpcFaucetWallet, WalletSettings};
pub use store::InMemoryStatusStore;
#[cfg(feature = "rocksdb")]
pub use store::RocksDbStatusStore;
