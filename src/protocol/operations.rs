//! Protocol operations.
//!
//! Serializable form of the engine workflows, for hosts that receive
//! operations as messages and dispatch them through `Engine::execute`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::liquidation::LiquidationOutcome;
use crate::utils::address::{Address, AssetId, Hash};
use crate::utils::math::Wad;

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// All user-facing workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolOperation {
    /// Lock collateral
    DepositCollateral {
        /// Depositor
        user: Address,
        /// Collateral asset
        asset: AssetId,
        /// Amount to lock
        amount: Wad,
    },
    /// Lock collateral and mint DSC in one step
    DepositCollateralAndMintDsc {
        /// Depositor and minter
        user: Address,
        /// Collateral asset
        asset: AssetId,
        /// Amount to lock
        amount_collateral: Wad,
        /// DSC to mint
        amount_dsc: Wad,
    },
    /// Withdraw collateral
    RedeemCollateral {
        /// Position owner
        user: Address,
        /// Collateral asset
        asset: AssetId,
        /// Amount to withdraw
        amount: Wad,
    },
    /// Repay DSC and withdraw collateral in one step
    RedeemCollateralForDsc {
        /// Position owner
        user: Address,
        /// Collateral asset
        asset: AssetId,
        /// Amount to withdraw
        amount_collateral: Wad,
        /// DSC to repay
        amount_dsc: Wad,
    },
    /// Mint DSC against deposited collateral
    MintDsc {
        /// Minter
        user: Address,
        /// Amount to mint
        amount: Wad,
    },
    /// Repay DSC debt
    BurnDsc {
        /// Position owner and payer
        user: Address,
        /// Amount to repay
        amount: Wad,
    },
    /// Repay part of an unsafe position's debt for its collateral
    Liquidate {
        /// Account repaying the debt
        liquidator: Address,
        /// Collateral asset to seize
        asset: AssetId,
        /// Unsafe position
        target: Address,
        /// DSC to repay
        debt_to_cover: Wad,
    },
}

impl ProtocolOperation {
    /// Get the operation type name
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::DepositCollateral { .. } => "DepositCollateral",
            Self::DepositCollateralAndMintDsc { .. } => "DepositCollateralAndMintDsc",
            Self::RedeemCollateral { .. } => "RedeemCollateral",
            Self::RedeemCollateralForDsc { .. } => "RedeemCollateralForDsc",
            Self::MintDsc { .. } => "MintDsc",
            Self::BurnDsc { .. } => "BurnDsc",
            Self::Liquidate { .. } => "Liquidate",
        }
    }

    /// Account submitting the operation
    pub fn caller(&self) -> Address {
        match self {
            Self::DepositCollateral { user, .. }
            | Self::DepositCollateralAndMintDsc { user, .. }
            | Self::RedeemCollateral { user, .. }
            | Self::RedeemCollateralForDsc { user, .. }
            | Self::MintDsc { user, .. }
            | Self::BurnDsc { user, .. } => *user,
            Self::Liquidate { liquidator, .. } => *liquidator,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Operation hash
    pub fn hash(&self) -> Hash {
        Hash::sha256(&bincode::serialize(self).unwrap_or_default())
    }
}

/// Result of an executed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    /// Workflow completed
    Completed,
    /// Liquidation completed
    Liquidated(LiquidationOutcome),
}
