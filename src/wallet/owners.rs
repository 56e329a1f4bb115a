//! Owner registry
//!
//! The set of addresses allowed to initiate transfers and manage owners.

use crate::wallet::error::WalletError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of wallet owners
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct OwnerRegistry {
    owners: BTreeSet<String>,
}

impl OwnerRegistry {
    /// Create a registry whose only owner is `initial`
    pub fn new(initial: &str) -> Self {
        let mut owners = BTreeSet::new();
        owners.insert(initial.to_string());
        Self { owners }
    }

    /// Check if an address is an owner
    pub fn is_owner(&self, address: &str) -> bool {
        self.owners.contains(address)
    }

    /// Fail with `Unauthorized` unless `caller` is an owner
    pub fn require_owner(&self, caller: &str) -> Result<(), WalletError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(WalletError::Unauthorized(caller.to_string()))
        }
    }

    /// Add addresses on behalf of an owner
    ///
    /// Addresses already present are skipped. Returns the newly added ones
    /// in the order given.
    pub fn add_owners(
        &mut self,
        caller: &str,
        addresses: &[&str],
    ) -> Result<Vec<String>, WalletError> {
        self.require_owner(caller)?;

        let mut added = Vec::new();
        for address in addresses {
            if self.owners.insert(address.to_string()) {
                added.push(address.to_string());
            }
        }

        Ok(added)
    }

    /// Remove `owner` on behalf of `caller`
    pub fn remove_owner(&mut self, caller: &str, owner: &str) -> Result<(), WalletError> {
        self.require_owner(caller)?;

        if !self.owners.remove(owner) {
            return Err(WalletError::OwnerNotFound(owner.to_string()));
        }

        Ok(())
    }

    /// Remove the caller itself
    pub fn resign(&mut self, caller: &str) -> Result<(), WalletError> {
        if !self.owners.remove(caller) {
            return Err(WalletError::Unauthorized(caller.to_string()));
        }

        Ok(())
    }

    /// Owners in address order
    pub fn owners(&self) -> Vec<String> {
        self.owners.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_owner() {
        let registry = OwnerRegistry::new("deployer");

        assert!(registry.is_owner("deployer"));
        assert!(!registry.is_owner("wallet1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_owners_idempotent() {
        let mut registry = OwnerRegistry::new("deployer");

        let added = registry
            .add_owners("deployer", &["wallet1", "wallet2"])
            .unwrap();
        assert_eq!(added, vec!["wallet1", "wallet2"]);

        // Re-adding is a no-op, duplicates within one call collapse
        let added = registry
            .add_owners("wallet1", &["wallet2", "deployer", "wallet3", "wallet3"])
            .unwrap();
        assert_eq!(added, vec!["wallet3"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_add_owners_requires_owner() {
        let mut registry = OwnerRegistry::new("deployer");

        let result = registry.add_owners("stranger", &["stranger"]);
        assert!(matches!(result, Err(WalletError::Unauthorized(_))));
        assert!(!registry.is_owner("stranger"));
    }

    #[test]
    fn test_resign() {
        let mut registry = OwnerRegistry::new("deployer");
        registry.add_owners("deployer", &["wallet1"]).unwrap();

        registry.resign("deployer").unwrap();
        assert!(!registry.is_owner("deployer"));

        // Resigning twice fails
        assert!(matches!(
            registry.resign("deployer"),
            Err(WalletError::Unauthorized(_))
        ));
        assert_eq!(registry.owners(), vec!["wallet1"]);
    }

    #[test]
    fn test_remove_owner() {
        let mut registry = OwnerRegistry::new("deployer");
        registry.add_owners("deployer", &["wallet1"]).unwrap();

        assert!(matches!(
            registry.remove_owner("stranger", "wallet1"),
            Err(WalletError::Unauthorized(_))
        ));
        assert!(matches!(
            registry.remove_owner("deployer", "stranger"),
            Err(WalletError::OwnerNotFound(_))
        ));

        registry.remove_owner("wallet1", "deployer").unwrap();
        assert_eq!(registry.owners(), vec!["wallet1"]);
    }

    #[test]
    fn test_last_owner_can_resign() {
        let mut registry = OwnerRegistry::new("deployer");
        registry.resign("deployer").unwrap();
        assert!(registry.is_empty());
    }
}
