//! # Peer Identity
//!
//! Nodes report their libp2p identity as multihash bytes. The faucet keys
//! claims by the base58btc rendering of those bytes, the same string libp2p
//! prints for a peer (`Qm...` or `12D3Koo...`).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::PeerIdError;

/// Multihash code for identity (inline public key).
const MULTIHASH_IDENTITY: u64 = 0x00;
/// Multihash code for sha2-256.
const MULTIHASH_SHA2_256: u64 = 0x12;
/// Longest identity digest libp2p inlines.
const MAX_INLINE_KEY_LEN: usize = 42;

/// Stable identifier of a network peer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    /// Derive the identity from raw multihash bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PeerIdError> {
        if bytes.is_empty() {
            return Err(PeerIdError::Empty);
        }

        let (code, rest) = read_varint(bytes)?;
        let (declared, digest) = read_varint(rest)?;
        let declared = usize::try_from(declared).map_err(|_| PeerIdError::Truncated)?;

        match code {
            MULTIHASH_SHA2_256 if declared == 32 => {}
            MULTIHASH_IDENTITY if declared <= MAX_INLINE_KEY_LEN => {}
            MULTIHASH_SHA2_256 | MULTIHASH_IDENTITY => {
                return Err(PeerIdError::LengthMismatch {
                    declared,
                    actual: digest.len(),
                })
            }
            other => return Err(PeerIdError::UnsupportedHash(other)),
        }

        if digest.len() != declared {
            return Err(PeerIdError::LengthMismatch {
                declared,
                actual: digest.len(),
            });
        }

        let encoded = bs58::encode(bytes).into_string();
        if encoded.is_empty() {
            return Err(PeerIdError::Empty);
        }
        Ok(Self(encoded))
    }

    /// Identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unsigned LEB128 (multiformats varint), at most 9 bytes.
fn read_varint(bytes: &[u8]) -> Result<(u64, &[u8]), PeerIdError> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate().take(9) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, &bytes[i + 1..]));
        }
    }
    Err(PeerIdError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha256_peer(fill: impl Fn(u8) -> u8) -> Vec<u8> {
        let mut bytes = vec![0x12, 0x20];
        bytes.extend((0u8..32).map(fill));
        bytes
    }

    #[test]
    fn test_sha256_peer_id() {
        let id = PeerIdentity::from_bytes(&sha256_peer(|i| i)).unwrap();
        assert_eq!(id.as_str(), "QmNLfbof5rLekrACjeuLk9JmGZD2HDBHCU4z16iYKmx5SE");
    }

    #[test]
    fn test_identity_peer_id() {
        let id = PeerIdentity::from_bytes(&[0x00, 0x05, b'h', b'e', b'l', b'l', b'o']).unwrap();
        assert_eq!(id.as_str(), "13hC12xCn");
    }

    #[test]
    fn test_distinct_bytes_distinct_ids() {
        let a = PeerIdentity::from_bytes(&sha256_peer(|i| i)).unwrap();
        let b = PeerIdentity::from_bytes(&sha256_peer(|_| 7)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(PeerIdentity::from_bytes(&[]), Err(PeerIdError::Empty));
    }

    #[test]
    fn test_truncated_digest_rejected() {
        let mut bytes = sha256_peer(|i| i);
        bytes.pop();
        assert_eq!(
            PeerIdentity::from_bytes(&bytes),
            Err(PeerIdError::LengthMismatch {
                declared: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn test_unknown_hash_rejected() {
        assert_eq!(
            PeerIdentity::from_bytes(&[0x13, 0x01, 0xff]),
            Err(PeerIdError::UnsupportedHash(0x13))
        );
    }

    #[test]
    fn test_unterminated_varint_rejected() {
        assert_eq!(PeerIdentity::from_bytes(&[0x80, 0x80]), Err(PeerIdError::Truncated));
    }
}
