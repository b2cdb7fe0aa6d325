//! Utility modules for the DSC engine.
//!
//! This module contains shared utilities used across the engine:
//! - Identifiers and hashing
//! - Fixed-point arithmetic
//! - Validation helpers
//! - Constants

pub mod address;
pub mod constants;
pub mod math;
pub mod validation;

pub use address::*;
pub use constants::*;
pub use math::*;
pub use validation::*;
