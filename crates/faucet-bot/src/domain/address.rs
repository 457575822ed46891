//! # Chain Addresses
//!
//! Pactus addresses are bech32m strings: a network prefix (`pc` mainnet,
//! `tpc` testnet), the separator `1`, one 5-bit address-type symbol, the
//! 20-byte payload in 5-bit groups, and a 6-symbol checksum.

use std::fmt;

use super::errors::AddressError;

/// Testnet prefix.
pub const TESTNET_HRP: &str = "tpc";

/// Mainnet prefix.
pub const MAINNET_HRP: &str = "pc";

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32M_CONST: u32 = 0x2bc8_30a3;
const GENERATOR: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];
const CHECKSUM_LEN: usize = 6;
const MAX_LEN: usize = 90;
const PAYLOAD_LEN: usize = 20;

/// Type symbols: 1 validator (`tpc1p...`), 2 BLS account (`tpc1z...`),
/// 3 Ed25519 account (`tpc1r...`).
const ADDRESS_TYPES: std::ops::RangeInclusive<u8> = 1..=3;

/// A syntactically valid address in canonical (lowercase) form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    encoded: String,
}

impl Address {
    /// Parse `input` and require the network prefix `hrp`.
    pub fn parse(input: &str, hrp: &str) -> Result<Self, AddressError> {
        if input.is_empty() {
            return Err(AddressError::Empty);
        }
        if input.len() > MAX_LEN {
            return Err(AddressError::TooLong(input.len()));
        }

        let has_lower = input.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = input.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressError::MixedCase);
        }
        let encoded = input.to_ascii_lowercase();

        let separator = encoded.rfind('1').ok_or(AddressError::MissingSeparator)?;
        let (prefix, data_part) = (&encoded[..separator], &encoded[separator + 1..]);
        if prefix != hrp {
            return Err(AddressError::InvalidHrp {
                expected: hrp.to_string(),
                found: prefix.to_string(),
            });
        }
        if data_part.len() <= CHECKSUM_LEN {
            return Err(AddressError::InvalidLength(0));
        }

        let data = data_part
            .chars()
            .map(|c| {
                u8::try_from(c)
                    .ok()
                    .and_then(|b| CHARSET.iter().position(|&x| x == b))
                    .map(|p| p as u8)
                    .ok_or(AddressError::InvalidCharacter(c))
            })
            .collect::<Result<Vec<u8>, _>>()?;

        if !verify_checksum(prefix, &data) {
            return Err(AddressError::InvalidChecksum);
        }

        let values = &data[..data.len() - CHECKSUM_LEN];
        if !ADDRESS_TYPES.contains(&values[0]) {
            return Err(AddressError::UnsupportedType(values[0]));
        }
        let payload = convert_5_to_8(&values[1..])?;
        if payload.len() != PAYLOAD_LEN {
            return Err(AddressError::InvalidLength(payload.len()));
        }

        Ok(Self { encoded })
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

fn polymod(values: impl IntoIterator<Item = u8>) -> u32 {
    let mut chk: u32 = 1;
    for value in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(value);
        for (i, gen) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= gen;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> impl Iterator<Item = u8> + '_ {
    hrp.bytes()
        .map(|b| b >> 5)
        .chain(std::iter::once(0))
        .chain(hrp.bytes().map(|b| b & 0x1f))
}

fn verify_checksum(hrp: &str, data: &[u8]) -> bool {
    polymod(hrp_expand(hrp).chain(data.iter().copied())) == BECH32M_CONST
}

/// Regroup 5-bit symbols into bytes; leftover bits must be fewer than 5 and zero.
fn convert_5_to_8(data: &[u8]) -> Result<Vec<u8>, AddressError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(data.len() * 5 / 8);

    for &value in data {
        acc = (acc << 5) | u32::from(value);
        bits += 5;
        while bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
        acc &= (1 << bits) - 1;
    }

    if bits >= 5 || acc != 0 {
        return Err(AddressError::InvalidPadding);
    }
    Ok(out)
}
