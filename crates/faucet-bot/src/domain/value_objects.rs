//! # Value Objects
//!
//! Immutable values passed between the faucet components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// NanoPAC per PAC.
pub const NANOPAC_PER_PAC: u64 = 1_000_000_000;

/// A non-negative token amount held as NanoPAC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Create from raw NanoPAC.
    pub const fn from_nanopac(nanopac: u64) -> Self {
        Self(nanopac)
    }

    /// Convert a decimal PAC value, rounding to the nearest NanoPAC.
    ///
    /// Returns `None` for negative, non-finite or out-of-range input.
    pub fn from_pac(pac: f64) -> Option<Self> {
        if !pac.is_finite() || pac < 0.0 {
            return None;
        }
        let nanopac = (pac * NANOPAC_PER_PAC as f64).round();
        if nanopac > u64::MAX as f64 {
            return None;
        }
        Some(Self(nanopac as u64))
    }

    /// Convert a signed NanoPAC value reported by the node, clamping negatives to zero.
    pub fn from_signed_nanopac(nanopac: i64) -> Self {
        Self(u64::try_from(nanopac).unwrap_or(0))
    }

    /// Raw NanoPAC value.
    pub const fn as_nanopac(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    /// Six fractional digits, truncated: `5.000000 PAC`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANOPAC_PER_PAC;
        let micro = (self.0 % NANOPAC_PER_PAC) / 1_000;
        write!(f, "{}.{:06} PAC", whole, micro)
    }
}

/// Hash of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(String);

impl TxHash {
    /// Wrap a hash string. Empty strings are rejected.
    pub fn new(hash: impl Into<String>) -> Option<Self> {
        let hash = hash.into();
        if hash.trim().is_empty() {
            None
        } else {
            Some(Self(hash))
        }
    }

    /// Hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat identity of whoever asked for the faucet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Display name at request time.
    pub username: String,
    /// Stable chat-platform user id.
    pub user_id: String,
}

impl Requester {
    /// Create a requester.
    pub fn new(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id: user_id.into(),
        }
    }
}

/// Result of a successful dispense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaucetReceipt {
    /// Peer identity the claim was recorded under.
    pub peer_identity: String,
    /// Validator address that received the bond.
    pub validator_address: String,
    /// Amount bonded.
    pub amount: Amount,
    /// Transaction hash returned by the wallet.
    pub tx_hash: TxHash,
    /// False when the claim record could not be written.
    pub recorded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_from_pac() {
        assert_eq!(Amount::from_pac(5.0), Some(Amount::from_nanopac(5_000_000_000)));
        assert_eq!(Amount::from_pac(0.000000001), Some(Amount::from_nanopac(1)));
        assert_eq!(Amount::from_pac(-1.0), None);
        assert_eq!(Amount::from_pac(f64::NAN), None);
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::from_nanopac(5_000_000_000).to_string(), "5.000000 PAC");
        assert_eq!(Amount::from_nanopac(1_234_567_891).to_string(), "1.234567 PAC");
        assert_eq!(Amount::ZERO.to_string(), "0.000000 PAC");
    }

    #[test]
    fn test_amount_ordering() {
        assert!(Amount::from_nanopac(10) < Amount::from_nanopac(11));
        assert_eq!(Amount::from_signed_nanopac(-5), Amount::ZERO);
    }

    #[test]
    fn test_empty_tx_hash_rejected() {
        assert!(TxHash::new("").is_none());
        assert!(TxHash::new("   ").is_none());
        assert_eq!(TxHash::new("abcd").unwrap().as_str(), "abcd");
    }
}
