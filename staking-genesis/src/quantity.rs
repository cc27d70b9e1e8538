//! Token amounts
//!
//! [`Quantity`] is a non-negative integer amount backed by a 256-bit
//! unsigned integer. Every operation is checked: subtraction below zero
//! returns [`Error::Underflow`] and anything past 2^256 - 1 returns
//! [`Error::Overflow`]. Operations never mutate in place, they return a new
//! value.
//!
//! [`Precision`] converts whole tokens into base units
//! (`10^token_value_exponent`).

use crate::{Error, Result};
use primitive_types::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Non-negative token amount
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(U256);

impl Quantity {
    /// Zero
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Create from an integer
    pub fn from_u64(n: u64) -> Self {
        Self(U256::from(n))
    }

    /// Check for zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self + rhs`
    pub fn checked_add(&self, rhs: &Quantity) -> Result<Quantity> {
        self.0.checked_add(rhs.0).map(Self).ok_or(Error::Overflow)
    }

    /// `self - rhs`, failing with [`Error::Underflow`] when `self < rhs`
    pub fn checked_sub(&self, rhs: &Quantity) -> Result<Quantity> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(Error::Underflow {
            lhs: *self,
            rhs: *rhs,
        })
    }

    /// `self * rhs`
    pub fn checked_mul(&self, rhs: &Quantity) -> Result<Quantity> {
        self.0.checked_mul(rhs.0).map(Self).ok_or(Error::Overflow)
    }

    /// Convert whole tokens into base units
    pub fn scale_by(&self, precision: &Precision) -> Result<Quantity> {
        self.checked_mul(&precision.factor)
    }

    /// Parse a decimal string, allowing `,` digit-group separators
    pub fn from_human_readable(s: &str) -> Result<Quantity> {
        s.replace(',', "").parse()
    }
}

impl From<u64> for Quantity {
    fn from(n: u64) -> Self {
        Self::from_u64(n)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quantity({})", self.0)
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        // from_dec_str accepts an empty string as zero
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::parse("quantity", s, "expected a non-negative integer"));
        }
        U256::from_dec_str(trimmed)
            .map(Self)
            .map_err(|e| Error::parse("quantity", s, format!("{:?}", e)))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

struct QuantityVisitor;

impl<'de> de::Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Quantity, E> {
        Ok(Quantity::from_u64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Quantity, E> {
        u64::try_from(v)
            .map(Quantity::from_u64)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> std::result::Result<Quantity, E> {
        Ok(Quantity(U256::from(v)))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> std::result::Result<Quantity, E> {
        u128::try_from(v)
            .map(|v| Quantity(U256::from(v)))
            .map_err(|_| E::custom(format!("negative amount {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Quantity, E> {
        v.parse().map_err(E::custom)
    }
}

/// Base units per whole token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    exponent: u8,
    factor: Quantity,
}

impl Precision {
    /// `10^exponent`, failing with [`Error::Overflow`] past 256 bits
    pub fn from_exponent(exponent: u8) -> Result<Self> {
        let factor = U256::from(10u64)
            .checked_pow(U256::from(exponent))
            .ok_or(Error::Overflow)?;
        Ok(Self {
            exponent,
            factor: Quantity(factor),
        })
    }

    /// Exponent this precision was built from
    pub fn exponent(&self) -> u8 {
        self.exponent
    }

    /// Multiplier as a quantity
    pub fn factor(&self) -> Quantity {
        self.factor
    }
}
