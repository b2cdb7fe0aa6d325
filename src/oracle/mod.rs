//! Oracle module for price feeds.
//!
//! This module provides price feed functionality:
//! - The `PriceOracle` collaborator contract
//! - Aggregator round validation (staleness, completeness, sign)
//! - An in-memory feed with a controllable clock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dsc_engine::oracle::{Clock, ManualPriceFeed};
//!
//! let mut feed = ManualPriceFeed::new().with_clock(Clock::Fixed(1_700_000_000));
//! feed.set_usd_price(eth_usd, 2_000)?;
//! ```

pub mod price_feed;

pub use price_feed::*;
