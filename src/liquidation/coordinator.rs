//! Liquidation coordinator.
//!
//! Handles third-party liquidation of unsafe positions:
//! - Detection and prioritization of liquidatable accounts
//! - Seizure of collateral plus the liquidator bonus
//! - Debt reduction and health post-conditions
//!
//! The coordinator only touches the ledgers. Pulling and burning the
//! liquidator's DSC and releasing the seized collateral are settled by the
//! engine after `liquidate` returns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::asset::AssetRegistry;
use crate::core::collateral::{CollateralLedger, CollateralRedeemed};
use crate::core::config::EngineConfig;
use crate::core::debt::DebtLedger;
use crate::core::risk::{HealthFactor, RiskEngine};
use crate::error::{Error, Result};
use crate::oracle::PriceOracle;
use crate::utils::address::{Address, AssetId};
use crate::utils::constants::DEFAULT_MAX_EVENTS;
use crate::utils::math::{portion, Wad};
use crate::utils::validation::validate_non_zero;

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST / OUTCOME
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters of a single liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationRequest {
    /// Collateral asset to seize
    pub asset: AssetId,
    /// Unsafe position
    pub target: Address,
    /// DSC the liquidator repays on the target's behalf
    pub debt_to_cover: Wad,
    /// Account repaying the debt and receiving the collateral
    pub liquidator: Address,
}

/// Record of a completed liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Liquidated position
    pub target: Address,
    /// Liquidator
    pub liquidator: Address,
    /// Seized collateral asset
    pub asset: AssetId,
    /// Debt repaid
    pub debt_covered: Wad,
    /// Collateral equal in value to the repaid debt
    pub seized_base: Wad,
    /// Liquidator reward on top of `seized_base`
    pub bonus: Wad,
    /// `seized_base + bonus`
    pub total_seized: Wad,
    /// Target health before liquidation
    pub starting_health: HealthFactor,
    /// Target health after liquidation
    pub ending_health: HealthFactor,
}

impl LiquidationOutcome {
    /// Collateral movement recorded by the ledger
    pub fn redemption(&self) -> CollateralRedeemed {
        CollateralRedeemed {
            from: self.target,
            to: self.liquidator,
            asset: self.asset,
            amount: self.total_seized,
        }
    }
}

/// Liquidation statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationStats {
    /// Liquidations performed
    pub total_liquidations: u64,
    /// Debt repaid by liquidators
    pub total_debt_covered: Wad,
    /// Collateral seized, per asset
    pub collateral_seized: BTreeMap<AssetId, Wad>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION COORDINATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Applies liquidations to the ledgers and keeps their history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCoordinator {
    /// Recent outcomes
    records: Vec<LiquidationOutcome>,
    /// Maximum outcomes to keep
    max_records: usize,
    /// Liquidations performed
    total_liquidations: u64,
    /// Debt repaid by liquidators
    total_debt_covered: Wad,
    /// Collateral seized, per asset
    collateral_seized: BTreeMap<AssetId, Wad>,
}

impl Default for LiquidationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LiquidationCoordinator {
    /// Create a coordinator with no history
    pub fn new() -> Self {
        Self::with_max_records(DEFAULT_MAX_EVENTS)
    }

    /// Create a coordinator keeping at most `max_records` outcomes
    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: Vec::new(),
            max_records,
            total_liquidations: 0,
            total_debt_covered: Wad::ZERO,
            collateral_seized: BTreeMap::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIQUIDATION DETECTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Indebted accounts below the minimum health factor, least healthy first.
    ///
    /// Accounts whose collateral cannot be priced are skipped.
    pub fn find_liquidatable<O: PriceOracle + ?Sized>(
        &self,
        risk: &RiskEngine<'_, O>,
        debt: &DebtLedger,
        config: &EngineConfig,
    ) -> Vec<(Address, HealthFactor)> {
        let mut unsafe_accounts: Vec<_> = debt
            .debtors()
            .filter_map(|(user, _)| match risk.health_factor(user) {
                Ok(health) => Some((*user, health)),
                Err(e) => {
                    tracing::warn!("Cannot price account {}: {}", user.short(), e);
                    None
                }
            })
            .filter(|(_, health)| !health.is_safe(config.min_health_factor))
            .collect();

        unsafe_accounts.sort_by_key(|(user, health)| (*health, *user));
        unsafe_accounts
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIQUIDATION EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply a liquidation to the ledgers.
    ///
    /// On `Err` the ledgers may be partially updated; the caller restores its
    /// snapshot.
    pub fn liquidate<O: PriceOracle + ?Sized>(
        &mut self,
        registry: &AssetRegistry,
        collateral: &mut CollateralLedger,
        debt: &mut DebtLedger,
        oracle: &O,
        config: &EngineConfig,
        request: LiquidationRequest,
    ) -> Result<LiquidationOutcome> {
        let LiquidationRequest {
            asset,
            target,
            debt_to_cover,
            liquidator,
        } = request;

        validate_non_zero(debt_to_cover)?;
        registry.get(&asset)?;

        let (starting_health, seized_base) = {
            let risk = RiskEngine::new(registry, collateral, debt, oracle, config);
            let starting_health = risk.health_factor(&target)?;
            if starting_health.is_safe(config.min_health_factor) {
                return Err(Error::HealthFactorOk);
            }
            (starting_health, risk.usd_to_asset_amount(&asset, debt_to_cover)?)
        };

        let bonus = portion(seized_base, config.liquidation_bonus, config.liquidation_precision)?;
        let total_seized = seized_base.try_add(bonus, "seized collateral")?;

        // Fails with InsufficientBalance when the target lacks base + bonus
        collateral.withdraw(target, asset, total_seized, liquidator)?;
        debt.decrease(target, debt_to_cover)?;

        let risk = RiskEngine::new(registry, collateral, debt, oracle, config);
        let ending_health = risk.health_factor(&target)?;
        if ending_health <= starting_health {
            return Err(Error::HealthFactorNotImproved {
                before: starting_health.raw(),
                after: ending_health.raw(),
            });
        }
        risk.assert_safe(&liquidator)?;

        let outcome = LiquidationOutcome {
            target,
            liquidator,
            asset,
            debt_covered: debt_to_cover,
            seized_base,
            bonus,
            total_seized,
            starting_health,
            ending_health,
        };
        self.record(outcome);

        Ok(outcome)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Liquidations performed
    pub fn total_liquidations(&self) -> u64 {
        self.total_liquidations
    }

    /// Debt repaid by liquidators
    pub fn total_debt_covered(&self) -> Wad {
        self.total_debt_covered
    }

    /// Recent outcomes, oldest first
    pub fn recent_outcomes(&self) -> &[LiquidationOutcome] {
        &self.records
    }

    /// Recent outcomes for one liquidated account
    pub fn outcomes_for(&self, target: &Address) -> Vec<&LiquidationOutcome> {
        self.records.iter().filter(|o| o.target == *target).collect()
    }

    /// Aggregate statistics
    pub fn statistics(&self) -> LiquidationStats {
        LiquidationStats {
            total_liquidations: self.total_liquidations,
            total_debt_covered: self.total_debt_covered,
            collateral_seized: self.collateral_seized.clone(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn record(&mut self, outcome: LiquidationOutcome) {
        self.total_liquidations += 1;
        self.total_debt_covered = Wad::from_raw(
            self.total_debt_covered
                .raw()
                .saturating_add(outcome.debt_covered.raw()),
        );
        let seized = self.collateral_seized.entry(outcome.asset).or_insert(Wad::ZERO);
        *seized = Wad::from_raw(seized.raw().saturating_add(outcome.total_seized.raw()));

        self.records.push(outcome);
        if self.records.len() > self.max_records {
            self.records.drain(0..self.records.len() - self.max_records);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::Asset;
    use crate::oracle::{Clock, ManualPriceFeed};
    use crate::utils::address::FeedId;
    use crate::utils::constants::PRECISION;

    struct Fixture {
        registry: AssetRegistry,
        collateral: CollateralLedger,
        debt: DebtLedger,
        oracle: ManualPriceFeed,
        config: EngineConfig,
        coordinator: LiquidationCoordinator,
    }

    impl Fixture {
        /// Alice: 10 WETH against 5000 DSC at $2000
        fn new() -> Self {
            let registry = AssetRegistry::from_assets(vec![Asset {
                id: weth(),
                feed: eth_usd(),
            }])
            .unwrap();
            let mut oracle = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
            oracle.set_usd_price(eth_usd(), 2_000).unwrap();

            let mut collateral = CollateralLedger::new(registry.ids());
            collateral.deposit(alice(), weth(), Wad::from_units(10)).unwrap();
            let mut debt = DebtLedger::new();
            debt.increase(alice(), Wad::from_units(5_000)).unwrap();

            Self {
                registry,
                collateral,
                debt,
                oracle,
                config: EngineConfig::default(),
                coordinator: LiquidationCoordinator::new(),
            }
        }

        fn liquidate(&mut self, debt_to_cover: Wad) -> Result<LiquidationOutcome> {
            self.coordinator.liquidate(
                &self.registry,
                &mut self.collateral,
                &mut self.debt,
                &self.oracle,
                &self.config,
                LiquidationRequest {
                    asset: weth(),
                    target: alice(),
                    debt_to_cover,
                    liquidator: bob(),
                },
            )
        }
    }

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    fn eth_usd() -> FeedId {
        FeedId::from_label("eth-usd")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    #[test]
    fn test_cannot_liquidate_healthy_position() {
        let mut fx = Fixture::new();
        assert_eq!(fx.liquidate(Wad::from_units(100)), Err(Error::HealthFactorOk));
        assert_eq!(fx.coordinator.total_liquidations(), 0);
    }

    #[test]
    fn test_zero_debt_to_cover_rejected() {
        let mut fx = Fixture::new();
        fx.oracle.set_usd_price(eth_usd(), 900).unwrap();
        assert_eq!(fx.liquidate(Wad::ZERO), Err(Error::InvalidAmount));
    }

    #[test]
    fn test_full_liquidation() {
        let mut fx = Fixture::new();
        fx.oracle.set_usd_price(eth_usd(), 900).unwrap();

        let outcome = fx.liquidate(Wad::from_units(5_000)).unwrap();

        // 5000 / 900 = 5.5555...; bonus 10% of that
        assert_eq!(outcome.seized_base.raw(), 5_555_555_555_555_555_555);
        assert_eq!(outcome.bonus.raw(), 555_555_555_555_555_555);
        assert_eq!(outcome.total_seized.raw(), 6_111_111_111_111_111_110);
        assert_eq!(outcome.starting_health.raw(), 900_000_000_000_000_000);
        assert!(outcome.ending_health.is_unbounded());

        assert_eq!(fx.debt.debt_of(&alice()), Wad::ZERO);
        assert_eq!(
            fx.collateral.balance_of(&alice(), &weth()).unwrap().raw(),
            10 * PRECISION - 6_111_111_111_111_111_110
        );
        assert_eq!(fx.coordinator.statistics().collateral_seized[&weth()], outcome.total_seized);
    }

    #[test]
    fn test_partial_liquidation_improves_health() {
        let mut fx = Fixture::new();
        fx.oracle.set_usd_price(eth_usd(), 900).unwrap();

        let outcome = fx.liquidate(Wad::from_units(1_000)).unwrap();

        assert!(outcome.ending_health > outcome.starting_health);
        assert_eq!(fx.debt.debt_of(&alice()), Wad::from_units(4_000));
        assert_eq!(fx.coordinator.outcomes_for(&alice()).len(), 1);
        assert_eq!(outcome.redemption().to, bob());
    }

    #[test]
    fn test_insufficient_collateral_for_bonus() {
        let mut fx = Fixture::new();
        // 10 WETH at $500 = $5000 < debt + bonus
        fx.oracle.set_usd_price(eth_usd(), 500).unwrap();

        let result = fx.liquidate(Wad::from_units(5_000));
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
    }

    #[test]
    fn test_find_liquidatable() {
        let mut fx = Fixture::new();
        let carol = Address::from_label("carol");
        fx.collateral.deposit(carol, weth(), Wad::from_units(10)).unwrap();
        fx.debt.increase(carol, Wad::from_units(4_000)).unwrap();

        let risk = RiskEngine::new(&fx.registry, &fx.collateral, &fx.debt, &fx.oracle, &fx.config);
        assert!(fx.coordinator.find_liquidatable(&risk, &fx.debt, &fx.config).is_empty());

        fx.oracle.set_usd_price(eth_usd(), 700).unwrap();
        let risk = RiskEngine::new(&fx.registry, &fx.collateral, &fx.debt, &fx.oracle, &fx.config);
        let found = fx.coordinator.find_liquidatable(&risk, &fx.debt, &fx.config);

        // alice 0.7, carol 0.875
        assert_eq!(found.iter().map(|(user, _)| *user).collect::<Vec<_>>(), vec![alice(), carol]);
    }

    #[test]
    fn test_record_pruning() {
        let mut fx = Fixture::new();
        fx.coordinator = LiquidationCoordinator::with_max_records(1);
        fx.oracle.set_usd_price(eth_usd(), 900).unwrap();

        fx.liquidate(Wad::from_units(100)).unwrap();
        fx.liquidate(Wad::from_units(100)).unwrap();

        assert_eq!(fx.coordinator.recent_outcomes().len(), 1);
        assert_eq!(fx.coordinator.total_liquidations(), 2);
        assert_eq!(fx.coordinator.total_debt_covered(), Wad::from_units(200));
    }
}
