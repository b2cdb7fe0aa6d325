//! Liquidation module for the DSC engine.
//!
//! This module handles liquidations of unsafe positions:
//! - Detection of accounts below the minimum health factor
//! - Collateral seizure with a liquidator bonus
//! - Outcome history and statistics

pub mod coordinator;

pub use coordinator::*;
