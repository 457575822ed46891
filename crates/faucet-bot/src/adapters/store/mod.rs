//! # Status Store Backends
//!
//! - `InMemoryStatusStore` - tests and ephemeral runs
//! - `RocksDbStatusStore` - durable production store (feature `rocksdb`)

mod memory;
#[cfg(feature = "rocksdb")]
mod rocksdb_store;

pub use memory::InMemoryStatusStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbStatusStore, RocksDbStoreConfig, CF_CLAIMS};
