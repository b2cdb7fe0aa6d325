//! Price feed adapter.
//!
//! This module provides the oracle side of the engine:
//! - The `PriceOracle` trait the risk engine consumes
//! - Round validation (staleness and completeness)
//! - `ManualPriceFeed`, an in-memory aggregator-style feed

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::asset::Asset;
use crate::core::config::EngineConfig;
use crate::error::{Error, Result};
use crate::utils::address::FeedId;
use crate::utils::constants::*;
use crate::utils::math::feed_scale;
use crate::utils::validation::validate_price_freshness;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE QUOTE
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated USD price of one whole unit of collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Price with `decimals` implied decimal places
    pub price: u128,
    /// Decimal places of `price`
    pub decimals: u8,
}

impl PriceQuote {
    /// Create a quote
    pub fn new(price: u128, decimals: u8) -> Self {
        Self { price, decimals }
    }

    /// Price normalized to 18 decimals
    pub fn to_wad(&self) -> Result<u128> {
        self.price
            .checked_mul(feed_scale(self.decimals)?)
            .ok_or_else(|| Error::Overflow {
                operation: "normalize price".into(),
            })
    }
}

/// Source of collateral prices.
///
/// Implementations own staleness detection: a quote derived from a stale or
/// incomplete round must be rejected, never returned.
pub trait PriceOracle {
    /// Current USD price of one unit of `asset`
    fn get_price(&self, asset: &Asset) -> Result<PriceQuote>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUND DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// One aggregator round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Round identifier
    pub round_id: u64,
    /// Reported price (signed, as aggregators report it)
    pub answer: i128,
    /// Unix timestamp the round started
    pub started_at: u64,
    /// Unix timestamp the answer was last updated (0 = incomplete)
    pub updated_at: u64,
    /// Round in which the answer was computed
    pub answered_in_round: u64,
}

impl RoundData {
    /// A completed round answered in itself
    pub fn completed(round_id: u64, answer: i128, timestamp: u64) -> Self {
        Self {
            round_id,
            answer,
            started_at: timestamp,
            updated_at: timestamp,
            answered_in_round: round_id,
        }
    }
}

/// Validate a round and return its positive answer
pub fn check_round(round: &RoundData, now: u64, max_age: u64) -> Result<u128> {
    if round.updated_at == 0 || round.answered_in_round < round.round_id {
        return Err(Error::StalePrice {
            age: now.saturating_sub(round.updated_at),
            max_age,
        });
    }

    validate_price_freshness(round.updated_at, now, max_age)?;

    if round.answer <= 0 {
        return Err(Error::PriceUnavailable(format!(
            "non-positive answer {} in round {}",
            round.answer, round.round_id
        )));
    }

    Ok(round.answer as u128)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Time source used for staleness checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clock {
    /// Wall-clock time
    System,
    /// Fixed unix timestamp (deterministic tests, replay)
    Fixed(u64),
}

impl Clock {
    /// Current unix timestamp in seconds
    pub fn now(&self) -> u64 {
        match self {
            Clock::System => chrono::Utc::now().timestamp().max(0) as u64,
            Clock::Fixed(t) => *t,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MANUAL PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeedState {
    decimals: u8,
    history: Vec<RoundData>,
}

impl FeedState {
    fn latest(&self) -> Option<&RoundData> {
        self.history.last()
    }
}

/// In-memory price feed keyed by feed reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPriceFeed {
    feeds: HashMap<FeedId, FeedState>,
    clock: Clock,
    max_staleness: u64,
    max_history: usize,
}

impl Default for ManualPriceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualPriceFeed {
    /// Create a feed on the system clock with the default staleness bound
    pub fn new() -> Self {
        Self {
            feeds: HashMap::new(),
            clock: Clock::System,
            max_staleness: MAX_PRICE_STALENESS_SECS,
            max_history: 100,
        }
    }

    /// Create a feed whose staleness bound comes from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_max_staleness(config.max_price_staleness_secs)
    }

    /// Use a specific clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Use a specific staleness bound
    pub fn with_max_staleness(mut self, max_staleness: u64) -> Self {
        self.max_staleness = max_staleness;
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRICE UPDATES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Publish a new completed round stamped with the current time
    pub fn set_price(&mut self, feed: FeedId, answer: i128, decimals: u8) {
        let now = self.clock.now();
        let next_round = self
            .feeds
            .get(&feed)
            .and_then(FeedState::latest)
            .map(|round| round.round_id + 1)
            .unwrap_or(1);
        self.push_round(feed, decimals, RoundData::completed(next_round, answer, now));
    }

    /// Publish a whole-dollar price on an 8-decimal feed
    pub fn set_usd_price(&mut self, feed: FeedId, dollars: i128) -> Result<()> {
        let answer = dollars
            .checked_mul(10i128.pow(FEED_DECIMALS as u32))
            .ok_or_else(|| Error::Overflow {
                operation: format!("scaling ${} to {} decimals", dollars, FEED_DECIMALS),
            })?;
        self.set_price(feed, answer, FEED_DECIMALS);
        Ok(())
    }

    /// Publish an arbitrary round, complete or not
    pub fn push_round(&mut self, feed: FeedId, decimals: u8, round: RoundData) {
        let state = self.feeds.entry(feed).or_insert_with(|| FeedState {
            decimals,
            history: Vec::new(),
        });
        state.decimals = decimals;
        state.history.push(round);
        if state.history.len() > self.max_history {
            state.history.remove(0);
        }
    }

    /// Move a fixed clock to `timestamp` (no effect on the system clock)
    pub fn set_time(&mut self, timestamp: u64) {
        if let Clock::Fixed(_) = self.clock {
            self.clock = Clock::Fixed(timestamp);
        }
    }

    /// Advance a fixed clock by `secs`
    pub fn advance(&mut self, secs: u64) {
        if let Clock::Fixed(t) = self.clock {
            self.clock = Clock::Fixed(t.saturating_add(secs));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Latest round of a feed, unvalidated
    pub fn latest_round(&self, feed: &FeedId) -> Option<RoundData> {
        self.feeds.get(feed).and_then(FeedState::latest).copied()
    }

    /// Validated price of a feed
    pub fn quote(&self, feed: &FeedId) -> Result<PriceQuote> {
        let state = self
            .feeds
            .get(feed)
            .ok_or_else(|| Error::PriceUnavailable(format!("no rounds for feed {}", feed)))?;
        let round = state
            .latest()
            .ok_or_else(|| Error::PriceUnavailable(format!("no rounds for feed {}", feed)))?;

        let price = check_round(round, self.clock.now(), self.max_staleness)?;
        Ok(PriceQuote::new(price, state.decimals))
    }
}

impl PriceOracle for ManualPriceFeed {
    fn get_price(&self, asset: &Asset) -> Result<PriceQuote> {
        self.quote(&asset.feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::address::AssetId;

    fn eth_feed() -> FeedId {
        FeedId::from_label("eth-usd")
    }

    fn weth() -> Asset {
        Asset {
            id: AssetId::from_label("weth"),
            feed: eth_feed(),
        }
    }

    #[test]
    fn test_quote_normalization() {
        let quote = PriceQuote::new(2_000 * 100_000_000, 8);
        assert_eq!(quote.to_wad().unwrap(), 2_000 * PRECISION);

        let quote = PriceQuote::new(2_000 * PRECISION, 18);
        assert_eq!(quote.to_wad().unwrap(), 2_000 * PRECISION);
    }

    #[test]
    fn test_set_usd_price() {
        let mut feed = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
        feed.set_usd_price(eth_feed(), 2_000).unwrap();

        let quote = feed.get_price(&weth()).unwrap();
        assert_eq!(quote, PriceQuote::new(200_000_000_000, 8));
        assert_eq!(feed.latest_round(&eth_feed()).unwrap().round_id, 1);

        feed.set_usd_price(eth_feed(), 900).unwrap();
        assert_eq!(feed.latest_round(&eth_feed()).unwrap().round_id, 2);
    }

    #[test]
    fn test_set_usd_price_overflow() {
        let mut feed = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
        assert!(matches!(
            feed.set_usd_price(eth_feed(), i128::MAX / 10),
            Err(Error::Overflow { .. })
        ));
        assert!(feed.latest_round(&eth_feed()).is_none());
    }

    #[test]
    fn test_future_round_unavailable() {
        let mut feed = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
        feed.push_round(eth_feed(), 8, RoundData::completed(1, 2_000, 1_001));

        assert!(matches!(feed.get_price(&weth()), Err(Error::PriceUnavailable(_))));
    }

    #[test]
    fn test_stale_after_timeout() {
        let mut feed = ManualPriceFeed::new()
            .with_clock(Clock::Fixed(1_000))
            .with_max_staleness(3600);
        feed.set_usd_price(eth_feed(), 2_000).unwrap();

        feed.advance(3600);
        assert!(feed.get_price(&weth()).is_ok());

        feed.advance(1);
        assert_eq!(
            feed.get_price(&weth()),
            Err(Error::StalePrice { age: 3601, max_age: 3600 })
        );
    }

    #[test]
    fn test_incomplete_round_rejected() {
        let mut feed = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
        feed.push_round(
            eth_feed(),
            8,
            RoundData {
                round_id: 5,
                answer: 2_000,
                started_at: 990,
                updated_at: 990,
                answered_in_round: 4,
            },
        );
        assert!(matches!(feed.get_price(&weth()), Err(Error::StalePrice { .. })));

        feed.push_round(eth_feed(), 8, RoundData { updated_at: 0, ..RoundData::completed(6, 2_000, 0) });
        assert!(matches!(feed.get_price(&weth()), Err(Error::StalePrice { .. })));
    }

    #[test]
    fn test_non_positive_answer() {
        let mut feed = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
        feed.set_price(eth_feed(), -1, 8);
        assert!(matches!(feed.get_price(&weth()), Err(Error::PriceUnavailable(_))));
    }

    #[test]
    fn test_unknown_feed() {
        let feed = ManualPriceFeed::new();
        assert!(matches!(feed.get_price(&weth()), Err(Error::PriceUnavailable(_))));
    }

    #[test]
    fn test_system_clock_fresh() {
        let mut feed = ManualPriceFeed::new();
        feed.set_usd_price(eth_feed(), 2_000).unwrap();
        assert!(feed.get_price(&weth()).is_ok());
    }

    #[test]
    fn test_staleness_from_config() {
        let config = EngineConfig {
            max_price_staleness_secs: 60,
            ..EngineConfig::default()
        };
        let mut feed = ManualPriceFeed::from_config(&config).with_clock(Clock::Fixed(1_000));
        feed.set_usd_price(eth_feed(), 2_000).unwrap();

        feed.advance(60);
        assert!(feed.get_price(&weth()).is_ok());
        feed.advance(1);
        assert!(matches!(feed.get_price(&weth()), Err(Error::StalePrice { age: 61, max_age: 60 })));
    }
}
