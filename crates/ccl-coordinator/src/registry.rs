//! # Asset Config Registry
//!
//! Whitelist of (collateral token, price feed, settlement token) triples a
//! loan may be requested against. Only active configs originate new
//! requests; deactivating a config does not touch requests already open.
//!
//! Mutation is gated to the configuration authority by the coordinator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ccl_core::{Address, AssetConfigId};

use crate::error::CoordinatorError;

/// One approved triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Token borrowers deposit.
    pub collateral_token: Address,
    /// Oracle the option prices against.
    pub price_feed: Address,
    /// Token premiums and strikes are paid in.
    pub settlement_token: Address,
    /// Whether new requests may use this triple.
    pub is_active: bool,
}

impl AssetConfig {
    /// Composite key of this config.
    pub fn id(&self) -> AssetConfigId {
        AssetConfigId::derive(&self.collateral_token, &self.price_feed, &self.settlement_token)
    }
}

/// Registry of asset configs keyed by their composite id.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    configs: BTreeMap<AssetConfigId, AssetConfig>,
}

impl AssetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a triple. Idempotent: activating an active config is a no-op.
    ///
    /// Returns the config id.
    pub fn add(
        &mut self,
        collateral_token: Address,
        price_feed: Address,
        settlement_token: Address,
    ) -> Result<AssetConfigId, CoordinatorError> {
        for (field, addr) in [
            ("collateral_token", &collateral_token),
            ("price_feed", &price_feed),
            ("settlement_token", &settlement_token),
        ] {
            if addr.is_zero() {
                return Err(CoordinatorError::ZeroAddress { field });
            }
        }
        let config = AssetConfig {
            collateral_token,
            price_feed,
            settlement_token,
            is_active: true,
        };
        let id = config.id();
        self.configs.insert(id, config);
        Ok(id)
    }

    /// Deactivate a triple. Fails if it is not currently active.
    pub fn remove(
        &mut self,
        collateral_token: Address,
        price_feed: Address,
        settlement_token: Address,
    ) -> Result<AssetConfigId, CoordinatorError> {
        let id = AssetConfigId::derive(&collateral_token, &price_feed, &settlement_token);
        match self.configs.get_mut(&id) {
            Some(config) if config.is_active => {
                config.is_active = false;
                Ok(id)
            }
            _ => Err(CoordinatorError::AssetNotFound(id)),
        }
    }

    /// Whether a config is active.
    pub fn is_approved(&self, id: &AssetConfigId) -> bool {
        self.configs.get(id).is_some_and(|c| c.is_active)
    }

    /// Look up a config, active or not.
    pub fn get(&self, id: &AssetConfigId) -> Option<&AssetConfig> {
        self.configs.get(id)
    }

    /// All configs ever registered.
    pub fn iter(&self) -> impl Iterator<Item = &AssetConfig> {
        self.configs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple() -> (Address, Address, Address) {
        (
            Address::from_low_u64(1),
            Address::from_low_u64(2),
            Address::from_low_u64(3),
        )
    }

    #[test]
    fn add_then_approved() {
        let mut reg = AssetRegistry::new();
        let (c, p, s) = triple();
        let id = reg.add(c, p, s).unwrap();
        assert!(reg.is_approved(&id));
        assert_eq!(reg.get(&id).unwrap().price_feed, p);
    }

    #[test]
    fn add_is_idempotent() {
        let mut reg = AssetRegistry::new();
        let (c, p, s) = triple();
        let a = reg.add(c, p, s).unwrap();
        let b = reg.add(c, p, s).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.iter().count(), 1);
    }

    #[test]
    fn remove_deactivates() {
        let mut reg = AssetRegistry::new();
        let (c, p, s) = triple();
        let id = reg.add(c, p, s).unwrap();
        reg.remove(c, p, s).unwrap();
        assert!(!reg.is_approved(&id));
        assert!(reg.get(&id).is_some());
    }

    #[test]
    fn remove_inactive_fails() {
        let mut reg = AssetRegistry::new();
        let (c, p, s) = triple();
        assert!(matches!(
            reg.remove(c, p, s),
            Err(CoordinatorError::AssetNotFound(_))
        ));
        reg.add(c, p, s).unwrap();
        reg.remove(c, p, s).unwrap();
        assert!(matches!(
            reg.remove(c, p, s),
            Err(CoordinatorError::AssetNotFound(_))
        ));
    }

    #[test]
    fn readd_reactivates() {
        let mut reg = AssetRegistry::new();
        let (c, p, s) = triple();
        let id = reg.add(c, p, s).unwrap();
        reg.remove(c, p, s).unwrap();
        reg.add(c, p, s).unwrap();
        assert!(reg.is_approved(&id));
    }

    #[test]
    fn zero_address_rejected() {
        let mut reg = AssetRegistry::new();
        let (c, _, s) = triple();
        let err = reg.add(c, Address::ZERO, s).unwrap_err();
        assert_eq!(err, CoordinatorError::ZeroAddress { field: "price_feed" });
    }
}
