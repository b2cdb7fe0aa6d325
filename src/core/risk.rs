//! Risk engine.
//!
//! Prices collateral, derives the health factor of an account and decides
//! whether a position is safe. It only reads the ledgers; every mutation goes
//! through `CollateralLedger` and `DebtLedger`.
//!
//! ## Health factor
//!
//! ```text
//! adjusted = collateral_usd * liquidation_threshold / liquidation_precision
//! hf       = adjusted * PRECISION / debt        (debt > 0)
//! hf       = HealthFactor::MAX                  (debt == 0)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::asset::AssetRegistry;
use crate::core::collateral::CollateralLedger;
use crate::core::config::EngineConfig;
use crate::core::debt::DebtLedger;
use crate::error::{Error, Result};
use crate::oracle::PriceOracle;
use crate::utils::address::{Address, AssetId};
use crate::utils::constants::PRECISION;
use crate::utils::math::{mul_div, mul_div_saturating, Wad};

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH FACTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Safety margin of a position, 18-decimal fixed point (1e18 == 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthFactor(u128);

impl HealthFactor {
    /// Health factor of a position without debt
    pub const MAX: Self = Self(u128::MAX);

    /// Create from a raw fixed-point value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw fixed-point value
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// True when at or above `minimum`
    pub fn is_safe(&self, minimum: u128) -> bool {
        self.0 >= minimum
    }

    /// True for a debt-free position
    pub fn is_unbounded(&self) -> bool {
        *self == Self::MAX
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "∞")
        } else {
            write!(f, "{}", Wad::from_raw(self.0))
        }
    }
}

/// Health factor from a debt and a collateral value, no ledger access
pub fn calculate_health_factor(
    total_debt: Wad,
    collateral_value_usd: Wad,
    config: &EngineConfig,
) -> Result<HealthFactor> {
    if total_debt.is_zero() {
        return Ok(HealthFactor::MAX);
    }

    let adjusted = mul_div(
        collateral_value_usd.raw(),
        config.liquidation_threshold,
        config.liquidation_precision,
    )?;

    // Tiny debts against large collateral exceed u128; clamp to MAX
    mul_div_saturating(adjusted, PRECISION, total_debt.raw()).map(HealthFactor)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Derived view of an account, recomputed on every read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Minted debt
    pub total_debt: Wad,
    /// Collateral valued at current prices
    pub collateral_value_usd: Wad,
}

impl AccountSnapshot {
    /// Health factor of this snapshot
    pub fn health_factor(&self, config: &EngineConfig) -> Result<HealthFactor> {
        calculate_health_factor(self.total_debt, self.collateral_value_usd, config)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RISK ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only pricing and safety view over the ledgers
pub struct RiskEngine<'a, O: PriceOracle + ?Sized> {
    registry: &'a AssetRegistry,
    collateral: &'a CollateralLedger,
    debt: &'a DebtLedger,
    oracle: &'a O,
    config: &'a EngineConfig,
}

impl<'a, O: PriceOracle + ?Sized> RiskEngine<'a, O> {
    /// Borrow the state a risk computation needs
    pub fn new(
        registry: &'a AssetRegistry,
        collateral: &'a CollateralLedger,
        debt: &'a DebtLedger,
        oracle: &'a O,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            registry,
            collateral,
            debt,
            oracle,
            config,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRICING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Oracle price of one unit of `asset`, normalized to 18 decimals
    pub fn price_of(&self, asset: &AssetId) -> Result<u128> {
        let asset = self.registry.get(asset)?;
        let price = self.oracle.get_price(asset)?.to_wad()?;
        if price == 0 {
            return Err(Error::PriceUnavailable(format!("zero price for {}", asset.id)));
        }
        Ok(price)
    }

    /// USD value of `amount` units of `asset`
    pub fn usd_value(&self, asset: &AssetId, amount: Wad) -> Result<Wad> {
        let price = self.price_of(asset)?;
        mul_div(price, amount.raw(), PRECISION).map(Wad::from_raw)
    }

    /// Units of `asset` worth `usd_amount` at the current price
    pub fn usd_to_asset_amount(&self, asset: &AssetId, usd_amount: Wad) -> Result<Wad> {
        let price = self.price_of(asset)?;
        mul_div(usd_amount.raw(), PRECISION, price).map(Wad::from_raw)
    }

    /// Total USD value of a user's collateral across registered assets
    ///
    /// Assets the user holds none of are not priced, so a stale feed on an
    /// unrelated asset does not block the account.
    pub fn collateral_value_usd(&self, user: &Address) -> Result<Wad> {
        let mut total = Wad::ZERO;
        for asset in self.registry.ids() {
            let balance = self.collateral.balance_of(user, &asset)?;
            if balance.is_zero() {
                continue;
            }
            total = total.try_add(self.usd_value(&asset, balance)?, "collateral value")?;
        }
        Ok(total)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HEALTH
    // ═══════════════════════════════════════════════════════════════════════════

    /// Debt and collateral value of a user
    pub fn account_information(&self, user: &Address) -> Result<AccountSnapshot> {
        Ok(AccountSnapshot {
            total_debt: self.debt.debt_of(user),
            collateral_value_usd: self.collateral_value_usd(user)?,
        })
    }

    /// Current health factor of a user
    pub fn health_factor(&self, user: &Address) -> Result<HealthFactor> {
        let total_debt = self.debt.debt_of(user);
        if total_debt.is_zero() {
            return Ok(HealthFactor::MAX);
        }
        calculate_health_factor(total_debt, self.collateral_value_usd(user)?, self.config)
    }

    /// True when the user's health factor meets the minimum
    pub fn is_safe(&self, user: &Address) -> Result<bool> {
        Ok(self.health_factor(user)?.is_safe(self.config.min_health_factor))
    }

    /// Fail with `HealthFactorBroken` when the user is below the minimum
    pub fn assert_safe(&self, user: &Address) -> Result<()> {
        let health = self.health_factor(user)?;
        if !health.is_safe(self.config.min_health_factor) {
            return Err(Error::HealthFactorBroken(health.raw()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::Asset;
    use crate::oracle::{Clock, ManualPriceFeed};
    use crate::utils::address::FeedId;

    struct Fixture {
        registry: AssetRegistry,
        collateral: CollateralLedger,
        debt: DebtLedger,
        oracle: ManualPriceFeed,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = AssetRegistry::from_assets(vec![
                Asset { id: weth(), feed: FeedId::from_label("eth-usd") },
                Asset { id: wbtc(), feed: FeedId::from_label("btc-usd") },
            ])
            .unwrap();
            let mut oracle = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
            oracle.set_usd_price(FeedId::from_label("eth-usd"), 2_000).unwrap();
            oracle.set_usd_price(FeedId::from_label("btc-usd"), 1_000).unwrap();

            Self {
                collateral: CollateralLedger::new(registry.ids()),
                registry,
                debt: DebtLedger::new(),
                oracle,
                config: EngineConfig::default(),
            }
        }

        fn risk(&self) -> RiskEngine<'_, ManualPriceFeed> {
            RiskEngine::new(&self.registry, &self.collateral, &self.debt, &self.oracle, &self.config)
        }
    }

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    fn wbtc() -> AssetId {
        AssetId::from_label("wbtc")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    #[test]
    fn test_usd_value() {
        let fx = Fixture::new();
        let value = fx.risk().usd_value(&weth(), Wad::from_units(15)).unwrap();
        assert_eq!(value, Wad::from_units(30_000));
    }

    #[test]
    fn test_usd_to_asset_amount() {
        let fx = Fixture::new();
        let amount = fx.risk().usd_to_asset_amount(&weth(), Wad::from_units(100)).unwrap();
        assert_eq!(amount, Wad::from_raw(50_000_000_000_000_000));
    }

    #[test]
    fn test_collateral_value_multi_asset() {
        let mut fx = Fixture::new();
        fx.collateral.deposit(alice(), weth(), Wad::from_units(10)).unwrap();
        fx.collateral.deposit(alice(), wbtc(), Wad::from_units(1)).unwrap();

        let value = fx.risk().collateral_value_usd(&alice()).unwrap();
        assert_eq!(value, Wad::from_units(21_000));
    }

    #[test]
    fn test_health_factor_no_debt() {
        let fx = Fixture::new();
        let health = fx.risk().health_factor(&alice()).unwrap();
        assert_eq!(health, HealthFactor::MAX);
        assert!(fx.risk().is_safe(&alice()).unwrap());
    }

    #[test]
    fn test_health_factor_and_assert_safe() {
        let mut fx = Fixture::new();
        fx.collateral.deposit(alice(), weth(), Wad::from_units(10)).unwrap();
        fx.debt.increase(alice(), Wad::from_units(5_000)).unwrap();

        assert_eq!(fx.risk().health_factor(&alice()).unwrap().raw(), 2 * PRECISION);
        assert!(fx.risk().assert_safe(&alice()).is_ok());

        fx.oracle.set_usd_price(FeedId::from_label("eth-usd"), 900).unwrap();
        let health = fx.risk().health_factor(&alice()).unwrap();
        assert_eq!(health.raw(), 900_000_000_000_000_000);
        assert_eq!(
            fx.risk().assert_safe(&alice()),
            Err(Error::HealthFactorBroken(900_000_000_000_000_000))
        );
    }

    #[test]
    fn test_calculate_health_factor_pure() {
        let config = EngineConfig::default();
        let health =
            calculate_health_factor(Wad::from_units(100), Wad::from_units(1_000), &config).unwrap();
        assert_eq!(health.raw(), 5 * PRECISION);

        let health = calculate_health_factor(Wad::ZERO, Wad::ZERO, &config).unwrap();
        assert!(health.is_unbounded());

        let health = calculate_health_factor(Wad::from_raw(1), Wad::from_raw(u128::MAX), &config).unwrap();
        assert_eq!(health, HealthFactor::MAX);
    }

    #[test]
    fn test_unrelated_stale_feed_ignored() {
        let mut fx = Fixture::new();
        fx.collateral.deposit(alice(), weth(), Wad::from_units(1)).unwrap();
        fx.oracle.advance(crate::utils::constants::MAX_PRICE_STALENESS_SECS + 1);
        fx.oracle.set_usd_price(FeedId::from_label("eth-usd"), 2_000).unwrap();

        assert_eq!(fx.risk().collateral_value_usd(&alice()).unwrap(), Wad::from_units(2_000));
        assert!(matches!(
            fx.risk().usd_value(&wbtc(), Wad::from_units(1)),
            Err(Error::StalePrice { .. })
        ));
    }

    #[test]
    fn test_unregistered_asset() {
        let fx = Fixture::new();
        let doge = AssetId::from_label("doge");
        assert_eq!(
            fx.risk().usd_value(&doge, Wad::ONE),
            Err(Error::UnregisteredAsset(doge))
        );
    }
}
