//! Debt ledger.
//!
//! Minted-debt balance per user. Debt is denominated in the synthetic asset,
//! which is pegged 1:1 to USD, so a debt amount doubles as its USD value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::utils::address::Address;
use crate::utils::math::Wad;
use crate::utils::validation::validate_non_zero;

/// Minted debt keyed by user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtLedger {
    positions: HashMap<Address, Wad>,
    total: Wad,
}

impl DebtLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to a user's debt, returning the new balance
    pub fn increase(&mut self, user: Address, amount: Wad) -> Result<Wad> {
        validate_non_zero(amount)?;

        let current = self.debt_of(&user);
        let new_debt = current.try_add(amount, "mint debt")?;
        let new_total = self.total.try_add(amount, "total debt")?;

        self.positions.insert(user, new_debt);
        self.total = new_total;
        Ok(new_debt)
    }

    /// Remove from a user's debt, returning the new balance
    pub fn decrease(&mut self, user: Address, amount: Wad) -> Result<Wad> {
        validate_non_zero(amount)?;

        let remaining = self.debt_of(&user).try_sub(amount)?;
        let new_total = self.total.try_sub(amount)?;

        if remaining.is_zero() {
            self.positions.remove(&user);
        } else {
            self.positions.insert(user, remaining);
        }
        self.total = new_total;
        Ok(remaining)
    }

    /// Current debt of a user (zero when none was minted)
    pub fn debt_of(&self, user: &Address) -> Wad {
        self.positions.get(user).copied().unwrap_or(Wad::ZERO)
    }

    /// Total outstanding debt
    pub fn total_debt(&self) -> Wad {
        self.total
    }

    /// Users with outstanding debt
    pub fn debtors(&self) -> impl Iterator<Item = (&Address, &Wad)> {
        self.positions.iter()
    }

    /// Verify ledger invariant (total == sum of positions)
    pub fn verify_invariant(&self) -> bool {
        let sum = self
            .positions
            .values()
            .try_fold(0u128, |acc, amount| acc.checked_add(amount.raw()));
        sum == Some(self.total.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    #[test]
    fn test_increase_decrease() {
        let mut ledger = DebtLedger::new();

        assert_eq!(ledger.increase(alice(), Wad::from_units(5000)).unwrap(), Wad::from_units(5000));
        assert_eq!(ledger.decrease(alice(), Wad::from_units(2000)).unwrap(), Wad::from_units(3000));
        assert_eq!(ledger.total_debt(), Wad::from_units(3000));
        assert!(ledger.verify_invariant());
    }

    #[test]
    fn test_decrease_underflow() {
        let mut ledger = DebtLedger::new();
        ledger.increase(alice(), Wad::from_units(1)).unwrap();

        let result = ledger.decrease(alice(), Wad::from_units(2));

        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
        assert_eq!(ledger.debt_of(&alice()), Wad::from_units(1));
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let mut ledger = DebtLedger::new();
        assert_eq!(ledger.increase(alice(), Wad::ZERO), Err(Error::InvalidAmount));
        assert_eq!(ledger.decrease(alice(), Wad::ZERO), Err(Error::InvalidAmount));
    }

    #[test]
    fn test_full_repay_removes_position() {
        let mut ledger = DebtLedger::new();
        ledger.increase(alice(), Wad::from_units(1)).unwrap();
        ledger.decrease(alice(), Wad::from_units(1)).unwrap();

        assert_eq!(ledger.debtors().count(), 0);
        assert_eq!(ledger.debt_of(&alice()), Wad::ZERO);
    }
}
