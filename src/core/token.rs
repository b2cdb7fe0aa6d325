//! DSC synthetic asset.
//!
//! This module defines the contract the engine uses to move the synthetic
//! asset, together with `Stablecoin`, an in-memory implementation:
//! - Owner-only mint and burn
//! - Pulling user balances into engine custody
//! - Returning custody balances to users

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::address::{Address, Hash};
use crate::utils::constants::WAD_DECIMALS;
use crate::utils::math::Wad;
use crate::utils::validation::validate_non_zero;

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTHETIC ASSET CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// Synthetic-asset operations the engine depends on.
///
/// Every call is all-or-nothing: on `Err` no balance has changed. Burns and
/// outgoing transfers act on the engine's own custody balance.
pub trait SyntheticAsset {
    /// Create `amount` new units for `to`
    fn mint(&mut self, to: &Address, amount: Wad) -> Result<()>;

    /// Destroy `amount` units held in engine custody
    fn burn(&mut self, amount: Wad) -> Result<()>;

    /// Move `amount` from `user` into engine custody
    fn pull_from(&mut self, user: &Address, amount: Wad) -> Result<()>;

    /// Move `amount` from engine custody to `recipient`
    fn transfer_to(&mut self, recipient: &Address, amount: Wad) -> Result<()>;

    /// Units in circulation
    fn total_supply(&self) -> Wad;
}

// ═══════════════════════════════════════════════════════════════════════════════
// STABLECOIN
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory dollar-pegged token owned by an engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stablecoin {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    /// Only account allowed to mint and burn
    owner: Address,
    /// Circulating supply
    total_supply: Wad,
    /// Balances by account
    balances: HashMap<Address, Wad>,
}

impl Stablecoin {
    /// Create a token controlled by `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            name: "Decentralized Stable Coin".to_string(),
            symbol: "DSC".to_string(),
            decimals: WAD_DECIMALS,
            owner,
            total_supply: Wad::ZERO,
            balances: HashMap::new(),
        }
    }

    /// Account allowed to mint and burn
    pub fn owner(&self) -> Address {
        self.owner
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUPPLY MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mint as `caller`; only the owner may mint
    pub fn mint_as(&mut self, caller: &Address, to: &Address, amount: Wad) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::Unauthorized(*caller));
        }
        if to.is_zero() {
            return Err(Error::MintFailed("mint to the zero address".into()));
        }
        validate_non_zero(amount).map_err(|e| Error::MintFailed(e.to_string()))?;

        let new_supply = self
            .total_supply
            .try_add(amount, "mint total supply")
            .map_err(|e| Error::MintFailed(e.to_string()))?;
        let new_balance = self
            .balance_of(to)
            .try_add(amount, "mint balance")
            .map_err(|e| Error::MintFailed(e.to_string()))?;

        self.balances.insert(*to, new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Burn from `caller`'s own balance; only the owner may burn
    pub fn burn_as(&mut self, caller: &Address, amount: Wad) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::Unauthorized(*caller));
        }
        validate_non_zero(amount).map_err(|e| Error::BurnFailed(e.to_string()))?;

        let remaining = self
            .balance_of(caller)
            .try_sub(amount)
            .map_err(|e| Error::BurnFailed(e.to_string()))?;

        self.set_balance(*caller, remaining);
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSFERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Transfer tokens between accounts
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Wad) -> Result<()> {
        validate_non_zero(amount)?;

        let from_balance = self.balance_of(from);
        let remaining = from_balance.checked_sub(amount).ok_or_else(|| {
            Error::TransferFailed(format!(
                "{} holds {} DSC, {} requested",
                from.short(),
                from_balance,
                amount
            ))
        })?;
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance_of(to).try_add(amount, "transfer balance")?;

        self.set_balance(*from, remaining);
        self.balances.insert(*to, to_balance);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Balance of an account
    pub fn balance_of(&self, account: &Address) -> Wad {
        self.balances.get(account).copied().unwrap_or(Wad::ZERO)
    }

    /// Number of accounts with a balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Verify supply invariant (total_supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, balance| acc.checked_add(balance.raw()));
        sum == Some(self.total_supply.raw())
    }

    /// Digest of supply and balances, ordered by account
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();
        data.extend_from_slice(&self.total_supply.raw().to_be_bytes());

        let mut sorted: Vec<_> = self.balances.iter().collect();
        sorted.sort_by_key(|(account, _)| account.as_bytes());

        for (account, balance) in sorted {
            data.extend_from_slice(account.as_bytes());
            data.extend_from_slice(&balance.raw().to_be_bytes());
        }

        Hash::sha256(&data)
    }

    fn set_balance(&mut self, account: Address, balance: Wad) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

impl SyntheticAsset for Stablecoin {
    fn mint(&mut self, to: &Address, amount: Wad) -> Result<()> {
        let owner = self.owner;
        self.mint_as(&owner, to, amount)
    }

    fn burn(&mut self, amount: Wad) -> Result<()> {
        let owner = self.owner;
        self.burn_as(&owner, amount)
    }

    fn pull_from(&mut self, user: &Address, amount: Wad) -> Result<()> {
        let owner = self.owner;
        self.transfer(user, &owner, amount)
    }

    fn transfer_to(&mut self, recipient: &Address, amount: Wad) -> Result<()> {
        let owner = self.owner;
        self.transfer(&owner, recipient, amount)
    }

    fn total_supply(&self) -> Wad {
        self.total_supply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Address {
        Address::from_label("engine")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    #[test]
    fn test_mint() {
        let mut dsc = Stablecoin::new(engine());

        dsc.mint(&alice(), Wad::from_units(100)).unwrap();

        assert_eq!(dsc.balance_of(&alice()), Wad::from_units(100));
        assert_eq!(dsc.total_supply(), Wad::from_units(100));
        assert!(dsc.verify_supply_invariant());
    }

    #[test]
    fn test_mint_requires_owner() {
        let mut dsc = Stablecoin::new(engine());
        let result = dsc.mint_as(&alice(), &alice(), Wad::ONE);
        assert_eq!(result, Err(Error::Unauthorized(alice())));
        assert!(matches!(
            dsc.mint(&Address::ZERO, Wad::ONE),
            Err(Error::MintFailed(_))
        ));
    }

    #[test]
    fn test_pull_and_burn() {
        let mut dsc = Stablecoin::new(engine());
        dsc.mint(&alice(), Wad::from_units(100)).unwrap();

        dsc.pull_from(&alice(), Wad::from_units(40)).unwrap();
        assert_eq!(dsc.balance_of(&engine()), Wad::from_units(40));

        dsc.burn(Wad::from_units(40)).unwrap();
        assert_eq!(dsc.balance_of(&engine()), Wad::ZERO);
        assert_eq!(dsc.total_supply(), Wad::from_units(60));
        assert!(dsc.verify_supply_invariant());
    }

    #[test]
    fn test_burn_more_than_custody() {
        let mut dsc = Stablecoin::new(engine());
        dsc.mint(&alice(), Wad::from_units(1)).unwrap();
        assert!(matches!(dsc.burn(Wad::from_units(1)), Err(Error::BurnFailed(_))));
        assert_eq!(dsc.burn_as(&alice(), Wad::ONE), Err(Error::Unauthorized(alice())));
    }

    #[test]
    fn test_self_transfer_checks_balance() {
        let mut dsc = Stablecoin::new(engine());
        dsc.mint(&alice(), Wad::from_units(10)).unwrap();

        dsc.transfer(&alice(), &alice(), Wad::from_units(10)).unwrap();
        assert_eq!(dsc.balance_of(&alice()), Wad::from_units(10));

        let before = dsc.state_hash();
        assert!(matches!(
            dsc.transfer(&alice(), &alice(), Wad::from_units(11)),
            Err(Error::TransferFailed(_))
        ));
        assert_eq!(dsc.state_hash(), before);
    }

    #[test]
    fn test_transfer() {
        let mut dsc = Stablecoin::new(engine());
        dsc.mint(&alice(), Wad::from_units(10)).unwrap();

        dsc.transfer(&alice(), &bob(), Wad::from_units(4)).unwrap();
        assert_eq!(dsc.balance_of(&alice()), Wad::from_units(6));
        assert_eq!(dsc.balance_of(&bob()), Wad::from_units(4));

        let before = dsc.state_hash();
        assert!(matches!(
            dsc.transfer(&bob(), &alice(), Wad::from_units(5)),
            Err(Error::TransferFailed(_))
        ));
        assert_eq!(dsc.state_hash(), before);
    }

    #[test]
    fn test_return_from_custody() {
        let mut dsc = Stablecoin::new(engine());
        dsc.mint(&alice(), Wad::from_units(10)).unwrap();
        dsc.pull_from(&alice(), Wad::from_units(10)).unwrap();

        dsc.transfer_to(&alice(), Wad::from_units(10)).unwrap();
        assert_eq!(dsc.balance_of(&alice()), Wad::from_units(10));
        assert_eq!(dsc.holder_count(), 1);
    }
}
