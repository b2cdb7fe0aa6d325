//! Collateral custody.
//!
//! The engine moves collateral tokens through the `CollateralTransfer`
//! contract. `CollateralVault` is the in-memory implementation: user wallets
//! on one side, engine custody on the other.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetId, Hash};
use crate::utils::math::Wad;
use crate::utils::validation::validate_non_zero;

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFER CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral movements between users and the engine.
///
/// Both calls are atomic: `Err` means nothing moved.
pub trait CollateralTransfer {
    /// Move `amount` of `asset` from `user` into engine custody
    fn pull_from(&mut self, asset: &AssetId, user: &Address, amount: Wad) -> Result<()>;

    /// Move `amount` of `asset` from engine custody to `recipient`
    fn push_to(&mut self, asset: &AssetId, recipient: &Address, amount: Wad) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL VAULT
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory wallets plus engine custody, per asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralVault {
    wallets: HashMap<(AssetId, Address), Wad>,
    custody: HashMap<AssetId, Wad>,
}

impl CollateralVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund a user's wallet (faucet for tests and simulations)
    pub fn credit(&mut self, asset: AssetId, user: Address, amount: Wad) -> Result<()> {
        validate_non_zero(amount)?;
        let balance = self.wallet_balance(&asset, &user).try_add(amount, "credit wallet")?;
        self.wallets.insert((asset, user), balance);
        Ok(())
    }

    /// Tokens a user holds outside the engine
    pub fn wallet_balance(&self, asset: &AssetId, user: &Address) -> Wad {
        self.wallets.get(&(*asset, *user)).copied().unwrap_or(Wad::ZERO)
    }

    /// Tokens held by the engine
    pub fn custody_balance(&self, asset: &AssetId) -> Wad {
        self.custody.get(asset).copied().unwrap_or(Wad::ZERO)
    }

    /// Digest of wallets and custody, ordered by key
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();

        let mut custody: Vec<_> = self.custody.iter().collect();
        custody.sort_by_key(|(asset, _)| asset.address());
        for (asset, amount) in custody {
            data.extend_from_slice(asset.address().as_bytes());
            data.extend_from_slice(&amount.raw().to_be_bytes());
        }

        let mut wallets: Vec<_> = self.wallets.iter().collect();
        wallets.sort_by_key(|((asset, user), _)| (asset.address(), *user));
        for ((asset, user), amount) in wallets {
            data.extend_from_slice(asset.address().as_bytes());
            data.extend_from_slice(user.as_bytes());
            data.extend_from_slice(&amount.raw().to_be_bytes());
        }

        Hash::sha256(&data)
    }
}

impl CollateralTransfer for CollateralVault {
    fn pull_from(&mut self, asset: &AssetId, user: &Address, amount: Wad) -> Result<()> {
        let available = self.wallet_balance(asset, user);
        let remaining = available.checked_sub(amount).ok_or_else(|| {
            Error::TransferFailed(format!(
                "{} holds {} of {}, {} requested",
                user.short(),
                available,
                asset,
                amount
            ))
        })?;
        let custody = self.custody_balance(asset).try_add(amount, "custody balance")?;

        if remaining.is_zero() {
            self.wallets.remove(&(*asset, *user));
        } else {
            self.wallets.insert((*asset, *user), remaining);
        }
        self.custody.insert(*asset, custody);
        Ok(())
    }

    fn push_to(&mut self, asset: &AssetId, recipient: &Address, amount: Wad) -> Result<()> {
        let held = self.custody_balance(asset);
        let remaining = held.checked_sub(amount).ok_or_else(|| {
            Error::TransferFailed(format!("custody holds {} of {}, {} requested", held, asset, amount))
        })?;
        let wallet = self
            .wallet_balance(asset, recipient)
            .try_add(amount, "wallet balance")?;

        if remaining.is_zero() {
            self.custody.remove(asset);
        } else {
            self.custody.insert(*asset, remaining);
        }
        self.wallets.insert((*asset, *recipient), wallet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    #[test]
    fn test_pull_and_push() {
        let mut vault = CollateralVault::new();
        vault.credit(weth(), alice(), Wad::from_units(10)).unwrap();

        vault.pull_from(&weth(), &alice(), Wad::from_units(4)).unwrap();
        assert_eq!(vault.wallet_balance(&weth(), &alice()), Wad::from_units(6));
        assert_eq!(vault.custody_balance(&weth()), Wad::from_units(4));

        vault.push_to(&weth(), &alice(), Wad::from_units(4)).unwrap();
        assert_eq!(vault.wallet_balance(&weth(), &alice()), Wad::from_units(10));
        assert_eq!(vault.custody_balance(&weth()), Wad::ZERO);
    }

    #[test]
    fn test_pull_insufficient_is_atomic() {
        let mut vault = CollateralVault::new();
        vault.credit(weth(), alice(), Wad::from_units(1)).unwrap();
        let before = vault.state_hash();

        let result = vault.pull_from(&weth(), &alice(), Wad::from_units(2));

        assert!(matches!(result, Err(Error::TransferFailed(_))));
        assert_eq!(vault.state_hash(), before);
    }

    #[test]
    fn test_push_beyond_custody() {
        let mut vault = CollateralVault::new();
        assert!(matches!(
            vault.push_to(&weth(), &alice(), Wad::ONE),
            Err(Error::TransferFailed(_))
        ));
    }

    #[test]
    fn test_credit_zero_rejected() {
        let mut vault = CollateralVault::new();
        assert_eq!(vault.credit(weth(), alice(), Wad::ZERO), Err(Error::InvalidAmount));
    }
}
