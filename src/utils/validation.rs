//! Input validation utilities for the DSC engine.
//!
//! This module provides validation functions to ensure inputs meet
//! engine requirements before any ledger is touched.

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::Wad;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an amount is strictly positive
pub fn validate_non_zero(amount: Wad) -> Result<()> {
    if amount.is_zero() {
        return Err(Error::InvalidAmount);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an account is not the zero address
pub fn validate_account(account: &Address, name: &str) -> Result<()> {
    if account.is_zero() {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: "zero address".into(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate price round freshness against the current time
pub fn validate_price_freshness(updated_at: u64, current_time: u64, max_age: u64) -> Result<()> {
    if current_time < updated_at {
        return Err(Error::PriceUnavailable(format!(
            "round updated at {} is ahead of current time {}",
            updated_at, current_time
        )));
    }

    let age = current_time - updated_at;
    if age > max_age {
        return Err(Error::StalePrice { age, max_age });
    }

    Ok(())
}
