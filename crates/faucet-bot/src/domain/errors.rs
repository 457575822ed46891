//! # Domain Errors
//!
//! Error types for the faucet bot.
//!
//! `FaucetError` is the user-facing taxonomy: its `Display` text is the reply
//! sent back to the chat. The remaining enums belong to the ports that raise
//! them and are translated into `FaucetError` by the eligibility engine.

use thiserror::Error;

/// Outcome of a rejected or failed faucet request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaucetError {
    /// The submitted text is not a valid chain address.
    #[error(
        "Pactus Universal Robot is unable to handle your request. \
         If you are requesting testing faucet, supply the valid address."
    )]
    InvalidAddress,

    /// The node could not be reached or did not answer in time.
    #[error("The bot cannot establish connection to the blockchain network. Try again later.")]
    NodeUnreachable,

    /// No connected peer advertises the address, or its identity is unusable.
    #[error(
        "Your node information could not be obtained. \
         Make sure your node is fully synced before requesting the faucet."
    )]
    PeerInfoUnavailable,

    /// The peer identity already received the faucet.
    #[error("Sorry. You already received faucet using this address: {validator_address}")]
    AlreadyClaimed {
        /// Address recorded with the earlier claim
        validator_address: String,
    },

    /// The peer lags too far behind the chain tip.
    #[error(
        "Your node is not fully synchronised. It is behind by {lag} blocks. \
         Make sure that your node is fully synchronised before requesting faucet."
    )]
    NotSynced {
        /// Blocks between the chain tip and the peer's height
        lag: u32,
    },

    /// The claim records could not be read, so eligibility cannot be decided.
    #[error("Faucet records are temporarily unavailable. Try again later.")]
    StoreUnavailable,

    /// The faucet wallet holds less than one dispense.
    #[error("Insufficient faucet balance. Try again later.")]
    InsufficientFaucetBalance,

    /// The bonded transfer was not accepted.
    #[error("The faucet transaction could not be submitted. Try again later.")]
    TransferFailed,

    /// The claim could not be recorded after the transfer went through.
    #[error("Faucet claim could not be recorded: {0}")]
    StoreWriteFailed(String),
}

impl FaucetError {
    /// Text shown to the requester.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Short label used for metrics and structured logs.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            FaucetError::InvalidAddress => "invalid_address",
            FaucetError::NodeUnreachable => "node_unreachable",
            FaucetError::PeerInfoUnavailable => "peer_info_unavailable",
            FaucetError::AlreadyClaimed { .. } => "already_claimed",
            FaucetError::NotSynced { .. } => "not_synced",
            FaucetError::StoreUnavailable => "store_unavailable",
            FaucetError::InsufficientFaucetBalance => "insufficient_balance",
            FaucetError::TransferFailed => "transfer_failed",
            FaucetError::StoreWriteFailed(_) => "store_write_failed",
        }
    }
}

/// Node Query Facade errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Transport could not be established, timed out, or the call errored.
    #[error("Node connection error: {0}")]
    Connection(String),

    /// No connected peer advertises the consensus address.
    #[error("Peer not found for address {0}")]
    PeerNotFound(String),

    /// The node answered with something we could not interpret.
    #[error("Invalid node response: {0}")]
    InvalidResponse(String),
}

/// Faucet Wallet Facade errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Wallet service could not be reached or returned an RPC error.
    #[error("Wallet RPC error: {0}")]
    Rpc(String),

    /// Transaction was built but the wallet or node refused it.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The wallet returned no transaction hash.
    #[error("Wallet returned an empty transaction hash")]
    EmptyTransactionHash,

    /// The broadcast was sent but its reply never arrived; the transaction
    /// may or may not be on chain.
    #[error("Broadcast outcome unknown: {0}")]
    Unconfirmed(String),
}

impl WalletError {
    /// True when funds may have left the wallet despite the error.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, WalletError::Unconfirmed(_))
    }
}

/// Status Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record for this peer identity already exists.
    #[error("Claim record already exists for peer {0}")]
    AlreadyExists(String),

    /// Backend I/O failure.
    #[error("Store I/O error: {0}")]
    Io(String),

    /// Record could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

/// Address parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Empty input.
    #[error("Address is empty")]
    Empty,

    /// Longer than the bech32 limit.
    #[error("Address is too long: {0} characters")]
    TooLong(usize),

    /// No `1` separator between prefix and data.
    #[error("Address has no separator")]
    MissingSeparator,

    /// Human readable part does not match the configured network.
    #[error("Address prefix {found:?} does not match network prefix {expected:?}")]
    InvalidHrp {
        /// Configured prefix
        expected: String,
        /// Prefix found in the input
        found: String,
    },

    /// Character outside the bech32 alphabet.
    #[error("Invalid address character {0:?}")]
    InvalidCharacter(char),

    /// Upper and lower case mixed.
    #[error("Address mixes upper and lower case")]
    MixedCase,

    /// Bech32m checksum does not verify.
    #[error("Address checksum is invalid")]
    InvalidChecksum,

    /// Non-zero or oversized padding in the 5-bit to 8-bit conversion.
    #[error("Address data has invalid padding")]
    InvalidPadding,

    /// Payload is not 20 bytes.
    #[error("Address payload has invalid length {0}")]
    InvalidLength(usize),

    /// Address type is not a validator or account type.
    #[error("Unsupported address type {0}")]
    UnsupportedType(u8),
}

/// Peer identity derivation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerIdError {
    /// No identity bytes.
    #[error("Peer id is empty")]
    Empty,

    /// Varint header ended early or overflowed.
    #[error("Peer id multihash header is truncated")]
    Truncated,

    /// Multihash code other than identity or sha2-256.
    #[error("Unsupported multihash code {0:#x}")]
    UnsupportedHash(u64),

    /// Declared digest length does not match the bytes present.
    #[error("Multihash digest length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Length from the multihash header
        declared: usize,
        /// Bytes remaining after the header
        actual: usize,
    },
}
