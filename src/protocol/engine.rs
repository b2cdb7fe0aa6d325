//! DSC engine - workflow orchestration.
//!
//! The engine owns the ledgers and the three collaborators and composes
//! them into the user-facing workflows. Every workflow:
//!
//! 1. takes the reentrancy guard
//! 2. snapshots ledger state
//! 3. applies ledger mutations and their health post-conditions
//! 4. performs external transfers, journaling a compensation for each
//!
//! Any failure restores the snapshot and unwinds the journal, so a rejected
//! workflow leaves no observable trace.

use serde::{Deserialize, Serialize};

use crate::core::asset::{Asset, AssetRegistry};
use crate::core::collateral::CollateralLedger;
use crate::core::config::EngineConfig;
use crate::core::debt::DebtLedger;
use crate::core::risk::{calculate_health_factor, AccountSnapshot, HealthFactor, RiskEngine};
use crate::core::token::SyntheticAsset;
use crate::core::vault::CollateralTransfer;
use crate::error::{Error, Result};
use crate::liquidation::{LiquidationCoordinator, LiquidationOutcome, LiquidationRequest, LiquidationStats};
use crate::oracle::PriceOracle;
use crate::protocol::events::*;
use crate::protocol::guard::ReentrancyGuard;
use crate::protocol::operations::{OperationResult, ProtocolOperation};
use crate::protocol::settlement::Settlement;
use crate::utils::address::{Address, AssetId, FeedId};
use crate::utils::constants::PRECISION;
use crate::utils::math::{mul_div, Wad};
use crate::utils::validation::validate_account;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything a failed workflow must restore
#[derive(Debug, Clone)]
struct EngineState {
    collateral: CollateralLedger,
    debt: DebtLedger,
    liquidations: LiquidationCoordinator,
    events: EventLog,
}

/// Global collateral value against synthetic supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvencyReport {
    /// All deposited collateral at current prices
    pub collateral_value_usd: Wad,
    /// DSC in circulation
    pub synthetic_supply: Wad,
}

impl SolvencyReport {
    /// Collateral value covers the supply
    pub fn is_solvent(&self) -> bool {
        self.collateral_value_usd >= self.synthetic_supply
    }

    /// Collateral value over supply, 18 decimals (`None` without supply)
    pub fn collateral_ratio(&self) -> Option<Wad> {
        if self.synthetic_supply.is_zero() {
            return None;
        }
        mul_div(
            self.collateral_value_usd.raw(),
            PRECISION,
            self.synthetic_supply.raw(),
        )
        .ok()
        .map(Wad::from_raw)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateralized-debt engine for DSC
pub struct Engine<O, V, T>
where
    O: PriceOracle,
    V: CollateralTransfer,
    T: SyntheticAsset,
{
    /// Accepted collateral, fixed at construction
    registry: AssetRegistry,
    /// Risk parameters
    config: EngineConfig,
    /// Ledgers, liquidation history and events
    state: EngineState,
    /// Price source
    oracle: O,
    /// Collateral custody
    collateral_transfer: V,
    /// DSC token
    synthetic: T,
    /// Lock flag shared by every workflow
    guard: ReentrancyGuard,
}

impl<O, V, T> Engine<O, V, T>
where
    O: PriceOracle,
    V: CollateralTransfer,
    T: SyntheticAsset,
{
    /// Create an engine with default risk parameters
    pub fn new(registry: AssetRegistry, oracle: O, collateral_transfer: V, synthetic: T) -> Result<Self> {
        Self::with_config(registry, EngineConfig::default(), oracle, collateral_transfer, synthetic)
    }

    /// Create an engine with explicit risk parameters
    pub fn with_config(
        registry: AssetRegistry,
        config: EngineConfig,
        oracle: O,
        collateral_transfer: V,
        synthetic: T,
    ) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            "DSC engine v{} created with {} collateral assets",
            config.version,
            registry.len()
        );

        Ok(Self {
            state: EngineState {
                collateral: CollateralLedger::new(registry.ids()),
                debt: DebtLedger::new(),
                liquidations: LiquidationCoordinator::with_max_records(config.max_events),
                events: EventLog::with_capacity(config.max_events),
            },
            registry,
            config,
            oracle,
            collateral_transfer,
            synthetic,
            guard: ReentrancyGuard::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WORKFLOWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Lock collateral
    pub fn deposit_collateral(&mut self, user: Address, asset: AssetId, amount: Wad) -> Result<()> {
        self.transact("deposit_collateral", |engine, settlement| {
            engine.apply_deposit(settlement, user, asset, amount)
        })?;
        tracing::info!("{} deposited {} of {}", user.short(), amount, asset);
        Ok(())
    }

    /// Lock collateral and mint DSC in one step
    pub fn deposit_collateral_and_mint_dsc(
        &mut self,
        user: Address,
        asset: AssetId,
        amount_collateral: Wad,
        amount_dsc: Wad,
    ) -> Result<()> {
        self.transact("deposit_collateral_and_mint_dsc", |engine, settlement| {
            engine.apply_deposit(settlement, user, asset, amount_collateral)?;
            engine.apply_mint(settlement, user, amount_dsc)
        })?;
        tracing::info!(
            "{} deposited {} of {} and minted {} DSC",
            user.short(),
            amount_collateral,
            asset,
            amount_dsc
        );
        Ok(())
    }

    /// Mint DSC against deposited collateral
    pub fn mint_dsc(&mut self, user: Address, amount: Wad) -> Result<()> {
        self.transact("mint_dsc", |engine, settlement| {
            engine.apply_mint(settlement, user, amount)
        })?;
        tracing::info!("{} minted {} DSC", user.short(), amount);
        Ok(())
    }

    /// Withdraw collateral
    pub fn redeem_collateral(&mut self, user: Address, asset: AssetId, amount: Wad) -> Result<()> {
        self.transact("redeem_collateral", |engine, settlement| {
            engine.apply_redeem(settlement, asset, amount, user, user)
        })?;
        tracing::info!("{} redeemed {} of {}", user.short(), amount, asset);
        Ok(())
    }

    /// Repay DSC, then withdraw collateral
    pub fn redeem_collateral_for_dsc(
        &mut self,
        user: Address,
        asset: AssetId,
        amount_collateral: Wad,
        amount_dsc: Wad,
    ) -> Result<()> {
        self.transact("redeem_collateral_for_dsc", |engine, settlement| {
            // Burn first so the redemption check sees the reduced debt
            engine.apply_burn(settlement, amount_dsc, user, user)?;
            engine.apply_redeem(settlement, asset, amount_collateral, user, user)
        })?;
        tracing::info!(
            "{} repaid {} DSC and redeemed {} of {}",
            user.short(),
            amount_dsc,
            amount_collateral,
            asset
        );
        Ok(())
    }

    /// Repay DSC debt
    pub fn burn_dsc(&mut self, user: Address, amount: Wad) -> Result<()> {
        self.transact("burn_dsc", |engine, settlement| {
            engine.apply_burn(settlement, amount, user, user)?;
            engine.risk().assert_safe(&user)
        })?;
        tracing::info!("{} burned {} DSC", user.short(), amount);
        Ok(())
    }

    /// Repay `debt_to_cover` of an unsafe position in exchange for its
    /// collateral plus the liquidation bonus
    pub fn liquidate(
        &mut self,
        liquidator: Address,
        asset: AssetId,
        target: Address,
        debt_to_cover: Wad,
    ) -> Result<LiquidationOutcome> {
        let outcome = self.transact("liquidate", |engine, settlement| {
            validate_account(&liquidator, "liquidator")?;

            let request = LiquidationRequest {
                asset,
                target,
                debt_to_cover,
                liquidator,
            };
            let outcome = engine.state.liquidations.liquidate(
                &engine.registry,
                &mut engine.state.collateral,
                &mut engine.state.debt,
                &engine.oracle,
                &engine.config,
                request,
            )?;

            engine.emit(ProtocolEvent::CollateralRedeemed(outcome.redemption()));
            engine.emit(ProtocolEvent::DscBurned(DscBurnedEvent {
                on_behalf_of: target,
                payer: liquidator,
                amount: debt_to_cover,
            }));
            engine.emit(ProtocolEvent::Liquidated(outcome));

            settlement.repay(&mut engine.synthetic, liquidator, debt_to_cover)?;
            settlement.push_collateral(
                &mut engine.collateral_transfer,
                asset,
                liquidator,
                outcome.total_seized,
            )?;
            Ok(outcome)
        })?;

        tracing::info!(
            "{} liquidated {}: covered {} DSC, seized {} of {} (health {} -> {})",
            liquidator.short(),
            target.short(),
            outcome.debt_covered,
            outcome.total_seized,
            asset,
            outcome.starting_health,
            outcome.ending_health
        );
        Ok(outcome)
    }

    /// Dispatch a serialized workflow
    pub fn execute(&mut self, op: ProtocolOperation) -> Result<OperationResult> {
        tracing::debug!("Executing {} for {}", op.operation_type(), op.caller().short());

        match op {
            ProtocolOperation::DepositCollateral { user, asset, amount } => {
                self.deposit_collateral(user, asset, amount)?
            }
            ProtocolOperation::DepositCollateralAndMintDsc {
                user,
                asset,
                amount_collateral,
                amount_dsc,
            } => self.deposit_collateral_and_mint_dsc(user, asset, amount_collateral, amount_dsc)?,
            ProtocolOperation::RedeemCollateral { user, asset, amount } => {
                self.redeem_collateral(user, asset, amount)?
            }
            ProtocolOperation::RedeemCollateralForDsc {
                user,
                asset,
                amount_collateral,
                amount_dsc,
            } => self.redeem_collateral_for_dsc(user, asset, amount_collateral, amount_dsc)?,
            ProtocolOperation::MintDsc { user, amount } => self.mint_dsc(user, amount)?,
            ProtocolOperation::BurnDsc { user, amount } => self.burn_dsc(user, amount)?,
            ProtocolOperation::Liquidate {
                liquidator,
                asset,
                target,
                debt_to_cover,
            } => {
                return self
                    .liquidate(liquidator, asset, target, debt_to_cover)
                    .map(OperationResult::Liquidated)
            }
        }

        Ok(OperationResult::Completed)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WORKFLOW STEPS
    // ═══════════════════════════════════════════════════════════════════════════

    fn apply_deposit(&mut self, settlement: &mut Settlement, user: Address, asset: AssetId, amount: Wad) -> Result<()> {
        validate_account(&user, "user")?;

        let deposited = self.state.collateral.deposit(user, asset, amount)?;
        self.emit(ProtocolEvent::CollateralDeposited(deposited));

        settlement.pull_collateral(&mut self.collateral_transfer, asset, user, amount)
    }

    fn apply_mint(&mut self, settlement: &mut Settlement, user: Address, amount: Wad) -> Result<()> {
        validate_account(&user, "user")?;

        self.state.debt.increase(user, amount)?;
        self.risk().assert_safe(&user)?;
        self.emit(ProtocolEvent::DscMinted(DscMintedEvent { user, amount }));

        settlement.mint(&mut self.synthetic, user, amount)
    }

    fn apply_redeem(
        &mut self,
        settlement: &mut Settlement,
        asset: AssetId,
        amount: Wad,
        from: Address,
        to: Address,
    ) -> Result<()> {
        validate_account(&to, "recipient")?;

        let redeemed = self.state.collateral.withdraw(from, asset, amount, to)?;
        self.risk().assert_safe(&from)?;
        self.emit(ProtocolEvent::CollateralRedeemed(redeemed));

        settlement.push_collateral(&mut self.collateral_transfer, asset, to, amount)
    }

    fn apply_burn(
        &mut self,
        settlement: &mut Settlement,
        amount: Wad,
        on_behalf_of: Address,
        payer: Address,
    ) -> Result<()> {
        self.state.debt.decrease(on_behalf_of, amount)?;
        self.emit(ProtocolEvent::DscBurned(DscBurnedEvent {
            on_behalf_of,
            payer,
            amount,
        }));

        settlement.repay(&mut self.synthetic, payer, amount)
    }

    fn emit(&mut self, event: ProtocolEvent) {
        self.state.events.push(event);
    }

    /// Run a workflow atomically under the reentrancy guard
    fn transact<R>(
        &mut self,
        workflow: &'static str,
        body: impl FnOnce(&mut Self, &mut Settlement) -> Result<R>,
    ) -> Result<R> {
        let _token = self.guard.enter().map_err(|e| {
            tracing::warn!("Rejected nested {}", workflow);
            e
        })?;

        let snapshot = self.state.clone();
        let mut settlement = Settlement::new();

        match body(self, &mut settlement) {
            Ok(result) => {
                settlement.commit();
                Ok(result)
            }
            Err(e) => {
                let pending = settlement.pending().len();
                let failures = settlement.unwind(&mut self.collateral_transfer, &mut self.synthetic);
                self.state = snapshot;

                if failures > 0 {
                    tracing::error!(
                        "{} rolled back with {} of {} compensations failed: {}",
                        workflow,
                        failures,
                        pending,
                        e
                    );
                } else {
                    tracing::warn!("{} rolled back: {}", workflow, e);
                }
                Err(e)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Read-only risk view over current state
    pub fn risk(&self) -> RiskEngine<'_, O> {
        RiskEngine::new(
            &self.registry,
            &self.state.collateral,
            &self.state.debt,
            &self.oracle,
            &self.config,
        )
    }

    /// Debt and collateral value of a user
    pub fn account_information(&self, user: &Address) -> Result<AccountSnapshot> {
        self.risk().account_information(user)
    }

    /// Current health factor of a user
    pub fn health_factor(&self, user: &Address) -> Result<HealthFactor> {
        self.risk().health_factor(user)
    }

    /// Health factor for arbitrary debt and collateral value
    pub fn calculate_health_factor(&self, total_debt: Wad, collateral_value_usd: Wad) -> Result<HealthFactor> {
        calculate_health_factor(total_debt, collateral_value_usd, &self.config)
    }

    /// USD value of `amount` units of `asset`
    pub fn usd_value(&self, asset: &AssetId, amount: Wad) -> Result<Wad> {
        self.risk().usd_value(asset, amount)
    }

    /// Units of `asset` worth `usd_amount`
    pub fn token_amount_from_usd(&self, asset: &AssetId, usd_amount: Wad) -> Result<Wad> {
        self.risk().usd_to_asset_amount(asset, usd_amount)
    }

    /// Total USD value of a user's collateral
    pub fn collateral_value_usd(&self, user: &Address) -> Result<Wad> {
        self.risk().collateral_value_usd(user)
    }

    /// Deposited balance of a user
    pub fn collateral_balance_of(&self, user: &Address, asset: &AssetId) -> Result<Wad> {
        self.state.collateral.balance_of(user, asset)
    }

    /// Minted debt of a user
    pub fn minted_dsc(&self, user: &Address) -> Wad {
        self.state.debt.debt_of(user)
    }

    /// Total minted debt
    pub fn total_debt(&self) -> Wad {
        self.state.debt.total_debt()
    }

    /// Accepted collateral in registration order
    pub fn collateral_assets(&self) -> &[Asset] {
        self.registry.assets()
    }

    /// Price feed of an accepted asset
    pub fn price_feed_of(&self, asset: &AssetId) -> Result<FeedId> {
        self.registry.feed_of(asset)
    }

    /// Risk parameters
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Indebted accounts below the minimum health factor, least healthy first
    pub fn liquidatable_accounts(&self) -> Vec<(Address, HealthFactor)> {
        self.state
            .liquidations
            .find_liquidatable(&self.risk(), &self.state.debt, &self.config)
    }

    /// Liquidation statistics
    pub fn liquidation_stats(&self) -> LiquidationStats {
        self.state.liquidations.statistics()
    }

    /// Recent liquidations, oldest first
    pub fn recent_liquidations(&self) -> &[LiquidationOutcome] {
        self.state.liquidations.recent_outcomes()
    }

    /// Events retained since the last drain
    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    /// Hand retained events to an indexer
    pub fn drain_events(&mut self) -> Vec<ProtocolEvent> {
        self.state.events.drain()
    }

    /// Global collateral value against DSC supply
    pub fn solvency(&self) -> Result<SolvencyReport> {
        let risk = self.risk();
        let mut collateral_value_usd = Wad::ZERO;

        for asset in self.registry.ids() {
            let deposited = self.state.collateral.total_deposited(&asset)?;
            if deposited.is_zero() {
                continue;
            }
            collateral_value_usd =
                collateral_value_usd.try_add(risk.usd_value(&asset, deposited)?, "total collateral value")?;
        }

        Ok(SolvencyReport {
            collateral_value_usd,
            synthetic_supply: self.synthetic.total_supply(),
        })
    }

    /// Check ledger bookkeeping invariants
    pub fn verify_invariants(&self) -> Result<()> {
        if !self.state.collateral.verify_invariant() {
            return Err(Error::InvariantViolation(
                "collateral totals differ from the sum of balances".into(),
            ));
        }
        if !self.state.debt.verify_invariant() {
            return Err(Error::InvariantViolation(
                "total debt differs from the sum of positions".into(),
            ));
        }
        let supply = self.synthetic.total_supply();
        let total_debt = self.state.debt.total_debt();
        if supply != total_debt {
            return Err(Error::InvariantViolation(format!(
                "DSC supply {} differs from total debt {}",
                supply, total_debt
            )));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLABORATORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Price source
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Price source, mutable (price updates)
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Collateral custody
    pub fn collateral_transfer(&self) -> &V {
        &self.collateral_transfer
    }

    /// DSC token
    pub fn synthetic(&self) -> &T {
        &self.synthetic
    }

    /// Handle to the engine's lock flag
    pub fn reentrancy_guard(&self) -> ReentrancyGuard {
        self.guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::Stablecoin;
    use crate::core::vault::CollateralVault;
    use crate::oracle::{Clock, ManualPriceFeed};

    type TestEngine = Engine<ManualPriceFeed, CollateralVault, Stablecoin>;

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    fn eth_usd() -> FeedId {
        FeedId::from_label("eth-usd")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn create_test_engine() -> TestEngine {
        let registry = AssetRegistry::new(vec![weth()], vec![eth_usd()]).unwrap();
        let mut oracle = ManualPriceFeed::new().with_clock(Clock::Fixed(1_000));
        oracle.set_usd_price(eth_usd(), 2_000).unwrap();
        let mut vault = CollateralVault::new();
        vault.credit(weth(), alice(), Wad::from_units(100)).unwrap();

        Engine::new(registry, oracle, vault, Stablecoin::new(Address::from_label("engine"))).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = create_test_engine();
        assert_eq!(engine.collateral_assets().len(), 1);
        assert_eq!(engine.price_feed_of(&weth()).unwrap(), eth_usd());
        assert!(engine.events().is_empty());
        assert!(!engine.reentrancy_guard().is_locked());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let registry = AssetRegistry::new(vec![weth()], vec![eth_usd()]).unwrap();
        let result = TestEngine::with_config(
            registry,
            EngineConfig::default().with_threshold(0),
            ManualPriceFeed::new(),
            CollateralVault::new(),
            Stablecoin::new(Address::from_label("engine")),
        );
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_deposit_and_mint() {
        let mut engine = create_test_engine();

        engine
            .deposit_collateral_and_mint_dsc(alice(), weth(), Wad::from_units(10), Wad::from_units(5_000))
            .unwrap();

        assert_eq!(engine.minted_dsc(&alice()), Wad::from_units(5_000));
        assert_eq!(engine.synthetic().balance_of(&alice()), Wad::from_units(5_000));
        assert_eq!(engine.collateral_transfer().custody_balance(&weth()), Wad::from_units(10));
        assert_eq!(engine.health_factor(&alice()).unwrap().raw(), 2 * PRECISION);
        assert_eq!(engine.events().len(), 2);
        assert!(!engine.reentrancy_guard().is_locked());
    }

    #[test]
    fn test_mint_breaking_health_rolls_back() {
        let mut engine = create_test_engine();
        engine.deposit_collateral(alice(), weth(), Wad::from_units(10)).unwrap();

        let result = engine.mint_dsc(alice(), Wad::from_units(10_001));

        assert!(matches!(result, Err(Error::HealthFactorBroken(_))));
        assert_eq!(engine.minted_dsc(&alice()), Wad::ZERO);
        assert_eq!(engine.synthetic().total_supply(), Wad::ZERO);
        assert_eq!(engine.events().len(), 1);
    }

    #[test]
    fn test_execute_dispatch() {
        let mut engine = create_test_engine();

        let result = engine
            .execute(ProtocolOperation::DepositCollateral {
                user: alice(),
                asset: weth(),
                amount: Wad::from_units(1),
            })
            .unwrap();

        assert_eq!(result, OperationResult::Completed);
        assert_eq!(engine.collateral_balance_of(&alice(), &weth()).unwrap(), Wad::from_units(1));
    }

    #[test]
    fn test_solvency_report() {
        let mut engine = create_test_engine();
        engine
            .deposit_collateral_and_mint_dsc(alice(), weth(), Wad::from_units(10), Wad::from_units(5_000))
            .unwrap();

        let report = engine.solvency().unwrap();
        assert_eq!(report.collateral_value_usd, Wad::from_units(20_000));
        assert_eq!(report.synthetic_supply, Wad::from_units(5_000));
        assert!(report.is_solvent());
        assert_eq!(report.collateral_ratio(), Some(Wad::from_units(4)));
        assert!(engine.verify_invariants().is_ok());
    }

    #[test]
    fn test_drain_events() {
        let mut engine = create_test_engine();
        engine.deposit_collateral(alice(), weth(), Wad::from_units(1)).unwrap();

        let drained = engine.drain_events();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].event_type(), "CollateralDeposited");
        assert!(engine.events().is_empty());
    }
}
