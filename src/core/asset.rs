//! Collateral asset registry.
//!
//! The set of accepted collateral assets and their price-feed references is
//! supplied once when the engine is built and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::address::{AssetId, FeedId};

/// An accepted collateral asset and the feed that prices it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    /// Asset identifier
    pub id: AssetId,
    /// Price feed reference
    pub feed: FeedId,
}

/// Immutable registry of collateral assets, in registration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRegistry {
    assets: Vec<Asset>,
    index: HashMap<AssetId, usize>,
}

impl AssetRegistry {
    /// Build from parallel lists of asset ids and feed references
    pub fn new(asset_ids: Vec<AssetId>, feeds: Vec<FeedId>) -> Result<Self> {
        if asset_ids.len() != feeds.len() {
            return Err(Error::InvalidParameter {
                name: "feeds".into(),
                reason: format!(
                    "{} assets but {} price feeds",
                    asset_ids.len(),
                    feeds.len()
                ),
            });
        }
        Self::from_assets(
            asset_ids
                .into_iter()
                .zip(feeds)
                .map(|(id, feed)| Asset { id, feed })
                .collect(),
        )
    }

    /// Build from (asset, feed) pairs
    pub fn from_assets(assets: Vec<Asset>) -> Result<Self> {
        if assets.is_empty() {
            return Err(Error::InvalidParameter {
                name: "assets".into(),
                reason: "at least one collateral asset is required".into(),
            });
        }

        let mut index = HashMap::with_capacity(assets.len());
        for (position, asset) in assets.iter().enumerate() {
            if index.insert(asset.id, position).is_some() {
                return Err(Error::DuplicateAsset(asset.id));
            }
        }

        Ok(Self { assets, index })
    }

    /// Look up a registered asset
    pub fn get(&self, id: &AssetId) -> Result<&Asset> {
        self.index
            .get(id)
            .map(|&position| &self.assets[position])
            .ok_or(Error::UnregisteredAsset(*id))
    }

    /// Price feed of a registered asset
    pub fn feed_of(&self, id: &AssetId) -> Result<FeedId> {
        self.get(id).map(|asset| asset.feed)
    }

    /// Check registration
    pub fn contains(&self, id: &AssetId) -> bool {
        self.index.contains_key(id)
    }

    /// All assets in registration order
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Asset ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.assets.iter().map(|asset| asset.id)
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Always false for a constructed registry
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    fn wbtc() -> AssetId {
        AssetId::from_label("wbtc")
    }

    #[test]
    fn test_registry_order_and_lookup() {
        let registry = AssetRegistry::new(
            vec![weth(), wbtc()],
            vec![FeedId::from_label("eth-usd"), FeedId::from_label("btc-usd")],
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![weth(), wbtc()]);
        assert_eq!(registry.feed_of(&wbtc()).unwrap(), FeedId::from_label("btc-usd"));
        assert!(registry.contains(&weth()));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = AssetRegistry::new(vec![weth(), wbtc()], vec![FeedId::from_label("eth-usd")]);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = AssetRegistry::new(
            vec![weth(), weth()],
            vec![FeedId::from_label("a"), FeedId::from_label("b")],
        );
        assert_eq!(result.unwrap_err(), Error::DuplicateAsset(weth()));
    }

    #[test]
    fn test_unregistered_lookup() {
        let registry = AssetRegistry::new(vec![weth()], vec![FeedId::from_label("eth-usd")]).unwrap();
        let unknown = AssetId::from_label("doge");
        assert_eq!(registry.get(&unknown).unwrap_err(), Error::UnregisteredAsset(unknown));
        assert!(AssetRegistry::new(vec![], vec![]).is_err());
    }
}
