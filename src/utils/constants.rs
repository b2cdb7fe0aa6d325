//! Engine constants and magic numbers.
//!
//! All engine-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimal places of every ledger amount and USD value
pub const WAD_DECIMALS: u8 = 18;

/// Fixed-point scale (1.0 = 10^18)
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Decimal places reported by standard USD price feeds
pub const FEED_DECIMALS: u8 = 8;

/// Scale adjustment applied to an 8-decimal feed answer (10^(18 - 8))
pub const ADDITIONAL_FEED_PRECISION: u128 = 10_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// RISK CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Share of nominal collateral value counted toward the safety margin - 50%
/// (a 200% overcollateralization requirement)
pub const LIQUIDATION_THRESHOLD: u128 = 50;

/// Liquidator reward, as a share of the seized base collateral - 10%
pub const LIQUIDATION_BONUS: u128 = 10;

/// Denominator for threshold and bonus (100 = 100%)
pub const LIQUIDATION_PRECISION: u128 = 100;

/// Minimum health factor of a safe position (1.0)
pub const MIN_HEALTH_FACTOR: u128 = PRECISION;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum age of an accepted price round in seconds (3 hours)
pub const MAX_PRICE_STALENESS_SECS: u64 = 3 * 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// BOOKKEEPING CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default number of events retained in memory
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// Length of an address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a hash in bytes (SHA256)
pub const HASH_LENGTH: usize = 32;
