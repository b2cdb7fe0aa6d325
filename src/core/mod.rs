//! Core modules for the DSC engine.
//!
//! This module contains the fundamental building blocks:
//! - Configuration and risk parameters
//! - Collateral asset registry
//! - Collateral and debt ledgers
//! - Health-factor computation
//! - DSC token and collateral custody collaborators

pub mod asset;
pub mod collateral;
pub mod config;
pub mod debt;
pub mod risk;
pub mod token;
pub mod vault;

pub use asset::*;
pub use collateral::*;
pub use config::*;
pub use debt::*;
pub use risk::*;
pub use token::*;
pub use vault::*;
