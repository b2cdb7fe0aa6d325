//! Fixed-point arithmetic and mathematical utilities.
//!
//! Ledger amounts and USD values are unsigned integers with 18 implied
//! decimals. Products of two such values exceed `u128`, so every
//! multiply-then-divide goes through a 256-bit intermediate.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::{PRECISION, WAD_DECIMALS};

// ═══════════════════════════════════════════════════════════════════════════════
// WAD
// ═══════════════════════════════════════════════════════════════════════════════

/// Amount with 18 decimal places (collateral quantities, debt, USD values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wad(u128);

impl Wad {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// One whole unit
    pub const ONE: Self = Self(PRECISION);

    /// Create from the raw scaled value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from whole units (scales up)
    pub fn from_units(units: u64) -> Self {
        Self((units as u128) * PRECISION)
    }

    /// Get the raw scaled value
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Whole units, truncated
    pub fn units(&self) -> u128 {
        self.0 / PRECISION
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Addition that reports overflow as an engine error
    pub fn try_add(self, other: Self, operation: &str) -> Result<Self> {
        self.checked_add(other).ok_or_else(|| Error::Overflow {
            operation: operation.into(),
        })
    }

    /// Subtraction that reports underflow as `InsufficientBalance`
    pub fn try_sub(self, other: Self) -> Result<Self> {
        self.checked_sub(other).ok_or(Error::InsufficientBalance {
            required: other.0,
            available: self.0,
        })
    }

    /// Format with all significant decimals, e.g. `6.111111111111111111`
    pub fn to_string_formatted(&self) -> String {
        let whole = self.0 / PRECISION;
        let frac = self.0 % PRECISION;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{:0width$}", frac, width = WAD_DECIMALS as usize);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_formatted())
    }
}

impl From<u128> for Wad {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl From<Wad> for u128 {
    fn from(amount: Wad) -> Self {
        amount.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes `(a * b) / c` with a 256-bit intermediate, rounding down
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    if result > U256::from(u128::MAX) {
        return Err(Error::Overflow {
            operation: format!("({} * {}) / {}", a, b, c),
        });
    }
    Ok(result.as_u128())
}

/// Same as [`mul_div`] but saturates at `u128::MAX` instead of failing
pub fn mul_div_saturating(a: u128, b: u128, c: u128) -> Result<u128> {
    match mul_div(a, b, c) {
        Err(Error::Overflow { .. }) => Ok(u128::MAX),
        other => other,
    }
}

/// Scale factor that lifts a price with `decimals` places to 18 places
pub fn feed_scale(decimals: u8) -> Result<u128> {
    if decimals > WAD_DECIMALS {
        return Err(Error::InvalidParameter {
            name: "decimals".into(),
            reason: format!("feed reports {} decimals, at most {} supported", decimals, WAD_DECIMALS),
        });
    }
    Ok(10u128.pow((WAD_DECIMALS - decimals) as u32))
}

/// Percentage of an amount, `amount * numerator / denominator`
pub fn portion(amount: Wad, numerator: u128, denominator: u128) -> Result<Wad> {
    mul_div(amount.raw(), numerator, denominator).map(Wad::from_raw)
}
