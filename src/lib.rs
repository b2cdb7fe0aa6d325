//! # DSC Engine
//!
//! A collateralized-debt engine for DSC, a dollar-pegged synthetic asset.
//! Users lock approved collateral, mint DSC against it, and anyone may
//! liquidate a position whose health factor drops below 1.0.
//!
//! ## Architecture
//!
//! The engine consists of several modules:
//!
//! - **Core**: Asset registry, collateral and debt ledgers, risk engine,
//!   configuration, and the DSC token and custody collaborators
//! - **Oracle**: Price feed contract and round validation
//! - **Liquidation**: Liquidation coordinator and statistics
//! - **Protocol**: Engine facade, events, reentrancy guard and settlement
//!
//! ## Design Principles
//!
//! - **Atomic**: a failed workflow leaves ledgers, events and collaborators
//!   as they were
//! - **Checked**: 18-decimal fixed point with 256-bit intermediates, no
//!   silent wraparound
//! - **Pluggable**: oracle, custody and token are traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsc_engine::prelude::*;
//!
//! let registry = AssetRegistry::new(vec![weth], vec![eth_usd])?;
//! let mut engine = Engine::new(registry, feed, vault, Stablecoin::new(engine_address))?;
//!
//! engine.deposit_collateral_and_mint_dsc(alice, weth, Wad::from_units(10), Wad::from_units(5_000))?;
//! assert!(engine.health_factor(&alice)?.is_safe(MIN_HEALTH_FACTOR));
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod core;
pub mod error;
pub mod liquidation;
pub mod oracle;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        asset::{Asset, AssetRegistry},
        collateral::{CollateralDeposited, CollateralLedger, CollateralRedeemed},
        config::EngineConfig,
        debt::DebtLedger,
        risk::{calculate_health_factor, AccountSnapshot, HealthFactor, RiskEngine},
        token::{Stablecoin, SyntheticAsset},
        vault::{CollateralTransfer, CollateralVault},
    };
    pub use crate::error::{Error, Result};
    pub use crate::liquidation::{LiquidationCoordinator, LiquidationOutcome, LiquidationStats};
    pub use crate::oracle::{Clock, ManualPriceFeed, PriceOracle, PriceQuote, RoundData};
    pub use crate::protocol::{
        engine::{Engine, SolvencyReport},
        events::{EventLog, ProtocolEvent},
        guard::ReentrancyGuard,
        operations::{OperationResult, ProtocolOperation},
    };
    pub use crate::utils::{
        address::{Address, AssetId, FeedId, Hash},
        constants::*,
        math::Wad,
    };
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "DSC";
