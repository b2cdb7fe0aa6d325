//! Error types for the DSC engine.
//!
//! Every workflow fault surfaces as one of these variants. None of them is
//! retried inside the engine; the caller sees a rejected operation and the
//! ledgers are left as they were.

use thiserror::Error;

use crate::utils::address::{Address, AssetId};

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the DSC engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount is zero where a positive value is required
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Invalid input or configuration parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Asset is not accepted as collateral
    #[error("Asset {0} is not registered as collateral")]
    UnregisteredAsset(AssetId),

    /// Asset appears twice in the registration list
    #[error("Asset {0} registered more than once")]
    DuplicateAsset(AssetId),

    // ═══════════════════════════════════════════════════════════════════
    // Ledger Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Ledger decrease larger than the current balance
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount the operation tried to remove
        required: u128,
        /// Amount actually held
        available: u128,
    },

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Health Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Post-condition violated: position below the minimum health factor
    #[error("Health factor {0} below minimum")]
    HealthFactorBroken(u128),

    /// Liquidation attempted on a safe position
    #[error("Health factor is ok, position cannot be liquidated")]
    HealthFactorOk,

    /// Liquidation did not improve the target's health factor
    #[error("Health factor not improved: before {before}, after {after}")]
    HealthFactorNotImproved {
        /// Health factor before liquidation
        before: u128,
        /// Health factor after liquidation
        after: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Price round is stale or incomplete
    #[error("Stale price: last update {age}s ago, max allowed {max_age}s")]
    StalePrice {
        /// Seconds since the round was updated
        age: u64,
        /// Maximum allowed age in seconds
        max_age: u64,
    },

    /// No usable price for the asset
    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    // ═══════════════════════════════════════════════════════════════════
    // Collaborator Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Collateral or synthetic-asset transfer signaled failure
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Synthetic-asset mint signaled failure
    #[error("Mint failed: {0}")]
    MintFailed(String),

    /// Synthetic-asset burn signaled failure
    #[error("Burn failed: {0}")]
    BurnFailed(String),

    /// Caller is not allowed to perform this action
    #[error("Not authorized: {0}")]
    Unauthorized(Address),

    // ═══════════════════════════════════════════════════════════════════
    // Engine Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A workflow was entered while another one is still executing
    #[error("Reentrant call rejected")]
    Reentrancy,

    /// Invariant violation detected
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the caller can fix the request and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidAmount
                | Error::InsufficientBalance { .. }
                | Error::HealthFactorBroken(_)
                | Error::HealthFactorOk
                | Error::HealthFactorNotImproved { .. }
                | Error::StalePrice { .. }
                | Error::TransferFailed(_)
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_) | Error::Overflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Validation errors: 1xxx
            Error::InvalidAmount => 1001,
            Error::InvalidParameter { .. } => 1002,
            Error::UnregisteredAsset(_) => 1003,
            Error::DuplicateAsset(_) => 1004,

            // Ledger errors: 2xxx
            Error::InsufficientBalance { .. } => 2001,
            Error::Overflow { .. } => 2002,

            // Health errors: 3xxx
            Error::HealthFactorBroken(_) => 3001,
            Error::HealthFactorOk => 3002,
            Error::HealthFactorNotImproved { .. } => 3003,

            // Oracle errors: 4xxx
            Error::StalePrice { .. } => 4001,
            Error::PriceUnavailable(_) => 4002,

            // Collaborator errors: 5xxx
            Error::TransferFailed(_) => 5001,
            Error::MintFailed(_) => 5002,
            Error::BurnFailed(_) => 5003,
            Error::Unauthorized(_) => 5004,

            // Engine errors: 6xxx
            Error::Reentrancy => 6001,
            Error::InvariantViolation(_) => 6002,

            // Internal errors: 9xxx
            Error::Serialization(_) => 9001,
            Error::Config(_) => 9002,
        }
    }
}
