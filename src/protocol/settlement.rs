//! External settlement with compensation.
//!
//! Ledger state is rolled back by restoring a snapshot, but collateral and
//! DSC movements already performed by collaborators are not. Every
//! successful external call records the action that reverses it; when a
//! later step fails the journal is unwound newest first.

use crate::core::token::SyntheticAsset;
use crate::core::vault::CollateralTransfer;
use crate::error::Result;
use crate::utils::address::{Address, AssetId};
use crate::utils::math::Wad;

/// Reversal of one completed external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Undo a collateral pull by pushing it back
    ReturnCollateral {
        /// Collateral asset
        asset: AssetId,
        /// Original owner
        to: Address,
        /// Amount pulled
        amount: Wad,
    },
    /// Undo a collateral push by pulling it back
    ReclaimCollateral {
        /// Collateral asset
        asset: AssetId,
        /// Account that received it
        from: Address,
        /// Amount pushed
        amount: Wad,
    },
    /// Undo a mint by pulling the minted DSC and burning it
    BurnMinted {
        /// Account holding the minted DSC
        holder: Address,
        /// Amount minted
        amount: Wad,
    },
    /// Undo a repayment by minting the burned DSC back to its payer
    RemintBurned {
        /// Account that paid
        to: Address,
        /// Amount burned
        amount: Wad,
    },
}

/// Journal of external calls made by one workflow
#[derive(Debug, Default)]
pub struct Settlement {
    journal: Vec<Compensation>,
}

impl Settlement {
    /// Start an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull collateral from `user` into custody
    pub fn pull_collateral<V: CollateralTransfer + ?Sized>(
        &mut self,
        vault: &mut V,
        asset: AssetId,
        user: Address,
        amount: Wad,
    ) -> Result<()> {
        vault.pull_from(&asset, &user, amount)?;
        self.journal.push(Compensation::ReturnCollateral { asset, to: user, amount });
        Ok(())
    }

    /// Release collateral from custody to `recipient`
    pub fn push_collateral<V: CollateralTransfer + ?Sized>(
        &mut self,
        vault: &mut V,
        asset: AssetId,
        recipient: Address,
        amount: Wad,
    ) -> Result<()> {
        vault.push_to(&asset, &recipient, amount)?;
        self.journal.push(Compensation::ReclaimCollateral {
            asset,
            from: recipient,
            amount,
        });
        Ok(())
    }

    /// Mint DSC to `to`
    pub fn mint<T: SyntheticAsset + ?Sized>(&mut self, token: &mut T, to: Address, amount: Wad) -> Result<()> {
        token.mint(&to, amount)?;
        self.journal.push(Compensation::BurnMinted { holder: to, amount });
        Ok(())
    }

    /// Pull DSC from `payer` and burn it.
    ///
    /// A failed burn returns the pulled DSC before the error propagates.
    pub fn repay<T: SyntheticAsset + ?Sized>(&mut self, token: &mut T, payer: Address, amount: Wad) -> Result<()> {
        token.pull_from(&payer, amount)?;

        if let Err(e) = token.burn(amount) {
            if let Err(undo) = token.transfer_to(&payer, amount) {
                tracing::error!(
                    "Failed to return {} DSC to {} after burn failure: {}",
                    amount,
                    payer.short(),
                    undo
                );
            }
            return Err(e);
        }

        self.journal.push(Compensation::RemintBurned { to: payer, amount });
        Ok(())
    }

    /// Compensations recorded so far, oldest first
    pub fn pending(&self) -> &[Compensation] {
        &self.journal
    }

    /// Keep every external effect
    pub fn commit(mut self) {
        self.journal.clear();
    }

    /// Reverse every recorded call, newest first; returns the number of
    /// compensations that failed
    pub fn unwind<V, T>(self, vault: &mut V, token: &mut T) -> usize
    where
        V: CollateralTransfer + ?Sized,
        T: SyntheticAsset + ?Sized,
    {
        let mut failures = 0;

        for compensation in self.journal.into_iter().rev() {
            let result = match compensation {
                Compensation::ReturnCollateral { asset, to, amount } => {
                    vault.push_to(&asset, &to, amount)
                }
                Compensation::ReclaimCollateral { asset, from, amount } => {
                    vault.pull_from(&asset, &from, amount)
                }
                Compensation::BurnMinted { holder, amount } => token
                    .pull_from(&holder, amount)
                    .and_then(|_| token.burn(amount)),
                Compensation::RemintBurned { to, amount } => token.mint(&to, amount),
            };

            if let Err(e) = result {
                failures += 1;
                tracing::error!("Compensation {:?} failed: {}", compensation, e);
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::Stablecoin;
    use crate::core::vault::CollateralVault;

    fn engine() -> Address {
        Address::from_label("engine")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    #[test]
    fn test_unwind_restores_collaborators() {
        let mut vault = CollateralVault::new();
        let mut dsc = Stablecoin::new(engine());
        vault.credit(weth(), alice(), Wad::from_units(10)).unwrap();
        let vault_before = vault.state_hash();
        let dsc_before = dsc.state_hash();

        let mut settlement = Settlement::new();
        settlement
            .pull_collateral(&mut vault, weth(), alice(), Wad::from_units(10))
            .unwrap();
        settlement.mint(&mut dsc, alice(), Wad::from_units(100)).unwrap();
        settlement.repay(&mut dsc, alice(), Wad::from_units(40)).unwrap();
        assert_eq!(settlement.pending().len(), 3);

        assert_eq!(settlement.unwind(&mut vault, &mut dsc), 0);
        assert_eq!(vault.state_hash(), vault_before);
        assert_eq!(dsc.state_hash(), dsc_before);
        assert_eq!(dsc.total_supply(), Wad::ZERO);
    }

    #[test]
    fn test_failed_pull_records_nothing() {
        let mut vault = CollateralVault::new();
        let mut settlement = Settlement::new();

        assert!(settlement
            .pull_collateral(&mut vault, weth(), alice(), Wad::ONE)
            .is_err());
        assert!(settlement.pending().is_empty());
    }

    #[test]
    fn test_repay_without_balance() {
        let mut dsc = Stablecoin::new(engine());
        let mut settlement = Settlement::new();

        assert!(settlement.repay(&mut dsc, alice(), Wad::ONE).is_err());
        assert!(settlement.pending().is_empty());
    }

    #[test]
    fn test_unwind_counts_failures() {
        let mut vault = CollateralVault::new();
        let mut dsc = Stablecoin::new(engine());
        let mut settlement = Settlement::new();
        settlement.mint(&mut dsc, alice(), Wad::from_units(5)).unwrap();

        // Holder spends the minted DSC before the unwind
        dsc.transfer(&alice(), &Address::from_label("bob"), Wad::from_units(5)).unwrap();

        assert_eq!(settlement.unwind(&mut vault, &mut dsc), 1);
    }
}
