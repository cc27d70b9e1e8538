//! Staking account addresses
//!
//! An address is a version byte followed by the first 20 bytes of
//! SHA-512/256(context || version || public key). Its text form is bech32
//! with the `oasis` human-readable part.

use crate::{
    crypto::{hash_with_context, PublicKey},
    Error, Result,
};
use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Address length in bytes
pub const ADDRESS_SIZE: usize = 21;

/// Human-readable part of the bech32 text form
pub const ADDRESS_BECH32_HRP: &str = "oasis";

const ADDRESS_V0_CONTEXT: &[u8] = b"oasis-core/address: staking";
const ADDRESS_V0_VERSION: u8 = 0;

/// Staking account address
///
/// Equality and ordering are byte-wise, so maps keyed by `Address` iterate
/// in a canonical order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Derive the address of an entity or account public key
    pub fn from_public_key(key: &PublicKey) -> Self {
        let digest = hash_with_context(&[
            ADDRESS_V0_CONTEXT,
            [ADDRESS_V0_VERSION].as_slice(),
            key.as_bytes().as_slice(),
        ]);

        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[0] = ADDRESS_V0_VERSION;
        bytes[1..].copy_from_slice(&digest[..ADDRESS_SIZE - 1]);
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Bech32 text form
    pub fn to_text(&self) -> String {
        // Encoding only fails on an invalid HRP, which is a constant here
        bech32::encode(ADDRESS_BECH32_HRP, self.0.to_base32(), Variant::Bech32)
            .unwrap_or_default()
    }

    /// Parse the bech32 text form
    pub fn from_text(s: &str) -> Result<Self> {
        let (hrp, data, variant) =
            bech32::decode(s).map_err(|e| Error::parse("address", s, e))?;
        if hrp != ADDRESS_BECH32_HRP {
            return Err(Error::parse(
                "address",
                s,
                format!("expected prefix {:?}, got {:?}", ADDRESS_BECH32_HRP, hrp),
            ));
        }
        if variant != Variant::Bech32 {
            return Err(Error::parse("address", s, "expected bech32, got bech32m"));
        }

        let raw = Vec::<u8>::from_base32(&data).map_err(|e| Error::parse("address", s, e))?;
        let bytes: [u8; ADDRESS_SIZE] = raw.try_into().map_err(|raw: Vec<u8>| {
            let reason = format!("expected {} bytes, got {}", ADDRESS_SIZE, raw.len());
            Error::parse("address", s, reason)
        })?;
        if bytes[0] != ADDRESS_V0_VERSION {
            return Err(Error::parse("address", s, format!("unsupported version {}", bytes[0])));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_text())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::from_text(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::from_text(&text).map_err(serde::de::Error::custom)
    }
}
