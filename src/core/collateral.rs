//! Collateral ledger.
//!
//! Per-user, per-asset deposited balances. The ledger knows the registered
//! asset set from construction; any access with an unknown asset fails with
//! `UnregisteredAsset` instead of reading as zero.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetId};
use crate::utils::math::Wad;
use crate::utils::validation::validate_non_zero;

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Emitted when collateral is deposited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDeposited {
    /// Depositor
    pub user: Address,
    /// Collateral asset
    pub asset: AssetId,
    /// Amount deposited
    pub amount: Wad,
}

/// Emitted when collateral leaves a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRedeemed {
    /// Position the collateral was taken from
    pub from: Address,
    /// Recipient of the collateral (differs from `from` on liquidation)
    pub to: Address,
    /// Collateral asset
    pub asset: AssetId,
    /// Amount redeemed
    pub amount: Wad,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET BOOK
// ═══════════════════════════════════════════════════════════════════════════════

/// Balances of a single collateral asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct AssetBook {
    balances: HashMap<Address, Wad>,
    total: Wad,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Deposited collateral keyed by asset, then by user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralLedger {
    books: BTreeMap<AssetId, AssetBook>,
}

impl CollateralLedger {
    /// Create an empty ledger for a fixed asset set
    pub fn new(assets: impl IntoIterator<Item = AssetId>) -> Self {
        Self {
            books: assets
                .into_iter()
                .map(|asset| (asset, AssetBook::default()))
                .collect(),
        }
    }

    fn book(&self, asset: &AssetId) -> Result<&AssetBook> {
        self.books.get(asset).ok_or(Error::UnregisteredAsset(*asset))
    }

    fn book_mut(&mut self, asset: &AssetId) -> Result<&mut AssetBook> {
        self.books.get_mut(asset).ok_or(Error::UnregisteredAsset(*asset))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEPOSIT/WITHDRAW
    // ═══════════════════════════════════════════════════════════════════════════

    /// Increase a user's balance of an asset
    pub fn deposit(&mut self, user: Address, asset: AssetId, amount: Wad) -> Result<CollateralDeposited> {
        validate_non_zero(amount)?;
        let book = self.book_mut(&asset)?;

        let current = book.balances.get(&user).copied().unwrap_or(Wad::ZERO);
        let new_balance = current.try_add(amount, "deposit collateral")?;
        let new_total = book.total.try_add(amount, "total collateral")?;

        book.balances.insert(user, new_balance);
        book.total = new_total;

        Ok(CollateralDeposited { user, asset, amount })
    }

    /// Decrease a user's balance of an asset on behalf of `recipient`
    pub fn withdraw(
        &mut self,
        user: Address,
        asset: AssetId,
        amount: Wad,
        recipient: Address,
    ) -> Result<CollateralRedeemed> {
        validate_non_zero(amount)?;
        let book = self.book_mut(&asset)?;

        let current = book.balances.get(&user).copied().unwrap_or(Wad::ZERO);
        let remaining = current.try_sub(amount)?;

        if remaining.is_zero() {
            book.balances.remove(&user);
        } else {
            book.balances.insert(user, remaining);
        }
        book.total = book.total.try_sub(amount)?;

        Ok(CollateralRedeemed {
            from: user,
            to: recipient,
            asset,
            amount,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Balance of a user for an asset
    pub fn balance_of(&self, user: &Address, asset: &AssetId) -> Result<Wad> {
        Ok(self
            .book(asset)?
            .balances
            .get(user)
            .copied()
            .unwrap_or(Wad::ZERO))
    }

    /// Total deposited across all users for an asset
    pub fn total_deposited(&self, asset: &AssetId) -> Result<Wad> {
        Ok(self.book(asset)?.total)
    }

    /// Number of users holding a non-zero balance of an asset
    pub fn holder_count(&self, asset: &AssetId) -> Result<usize> {
        Ok(self.book(asset)?.balances.len())
    }

    /// Non-zero balances of a user, ordered by asset id
    pub fn positions_of(&self, user: &Address) -> Vec<(AssetId, Wad)> {
        self.books
            .iter()
            .filter_map(|(asset, book)| book.balances.get(user).map(|amount| (*asset, *amount)))
            .collect()
    }

    /// Verify ledger invariant (each asset total == sum of its balances)
    pub fn verify_invariant(&self) -> bool {
        self.books.values().all(|book| {
            let sum = book
                .balances
                .values()
                .try_fold(0u128, |acc, amount| acc.checked_add(amount.raw()));
            sum == Some(book.total.raw())
        })
    }
}
