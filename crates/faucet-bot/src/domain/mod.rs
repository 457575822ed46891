//! # Domain Module
//!
//! Core domain types for the faucet: claim records, peer information,
//! addresses, peer identities, amounts and the error taxonomy.

pub mod address;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod peer_id;
pub mod value_objects;

pub use address::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use peer_id::*;
pub use value_objects::*;
