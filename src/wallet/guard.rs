//! One-shot transfer rights
//!
//! Every owner gets a single right to move value out of the wallet. The
//! guard checks and spends that right; the wallet performs the send only
//! after the spend is committed.

use crate::wallet::error::WalletError;
use crate::wallet::owners::OwnerRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State of an owner's transfer right
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferRight {
    Unconsumed,
    Consumed,
}

/// A spent right, carried to the send that it authorizes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    pub owner: String,
    pub amount: u128,
}

/// Per-address transfer rights
///
/// Rights outlive ownership: an address that resigns and is added back
/// keeps whatever state its right was in.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TransferGuard {
    rights: BTreeMap<String, TransferRight>,
}

impl TransferGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant an unconsumed right unless the address already has one
    ///
    /// Returns true if a right was created.
    pub fn grant(&mut self, address: &str) -> bool {
        if self.rights.contains_key(address) {
            return false;
        }
        self.rights
            .insert(address.to_string(), TransferRight::Unconsumed);
        true
    }

    /// Right state of an address, if it was ever an owner
    pub fn right_of(&self, address: &str) -> Option<TransferRight> {
        self.rights.get(address).copied()
    }

    pub fn has_unconsumed_right(&self, address: &str) -> bool {
        self.right_of(address) == Some(TransferRight::Unconsumed)
    }

    /// Number of rights already spent
    pub fn consumed_count(&self) -> usize {
        self.rights
            .values()
            .filter(|r| **r == TransferRight::Consumed)
            .count()
    }

    /// All rights in address order
    pub fn rights(&self) -> Vec<(String, TransferRight)> {
        self.rights.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Check a transfer request and spend the caller's right
    ///
    /// Checks run in a fixed order and all of them happen before the right
    /// is touched: owner, right, amount, balance. On success the right is
    /// already `Consumed` when this returns.
    pub fn authorize(
        &mut self,
        owners: &OwnerRegistry,
        caller: &str,
        amount: u128,
        balance: u128,
    ) -> Result<Authorization, WalletError> {
        owners.require_owner(caller)?;

        // An owner without a recorded right was restored from an older
        // snapshot; treat it as holding a fresh one.
        if self.right_of(caller) == Some(TransferRight::Consumed) {
            return Err(WalletError::RightAlreadyConsumed(caller.to_string()));
        }

        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }

        if amount > balance {
            return Err(WalletError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }

        self.rights
            .insert(caller.to_string(), TransferRight::Consumed);

        Ok(Authorization {
            owner: caller.to_string(),
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (OwnerRegistry, TransferGuard) {
        let mut owners = OwnerRegistry::new("deployer");
        owners.add_owners("deployer", &["wallet1"]).unwrap();

        let mut guard = TransferGuard::new();
        guard.grant("deployer");
        guard.grant("wallet1");

        (owners, guard)
    }

    #[test]
    fn test_grant_is_idempotent() {
        let mut guard = TransferGuard::new();

        assert!(guard.grant("wallet1"));
        assert!(!guard.grant("wallet1"));
        assert_eq!(guard.right_of("wallet1"), Some(TransferRight::Unconsumed));
        assert_eq!(guard.right_of("nobody"), None);
    }

    #[test]
    fn test_authorize_consumes_right() {
        let (owners, mut guard) = setup();

        let auth = guard.authorize(&owners, "wallet1", 10, 100).unwrap();

        assert_eq!(auth.owner, "wallet1");
        assert_eq!(auth.amount, 10);
        assert_eq!(guard.right_of("wallet1"), Some(TransferRight::Consumed));
        assert!(guard.has_unconsumed_right("deployer"));
        assert_eq!(guard.consumed_count(), 1);
    }

    #[test]
    fn test_second_authorization_rejected() {
        let (owners, mut guard) = setup();

        guard.authorize(&owners, "wallet1", 10, 100).unwrap();
        let result = guard.authorize(&owners, "wallet1", 10, 100);

        assert!(matches!(result, Err(WalletError::RightAlreadyConsumed(_))));
    }

    #[test]
    fn test_consumed_right_not_restored_by_grant() {
        let (owners, mut guard) = setup();

        guard.authorize(&owners, "wallet1", 10, 100).unwrap();
        assert!(!guard.grant("wallet1"));
        assert_eq!(guard.right_of("wallet1"), Some(TransferRight::Consumed));
    }

    #[test]
    fn test_non_owner_always_unauthorized() {
        let (owners, mut guard) = setup();

        // Regardless of balance or prior right state
        for balance in [0, 5, u128::MAX] {
            let result = guard.authorize(&owners, "stranger", 5, balance);
            assert!(matches!(result, Err(WalletError::Unauthorized(_))));
        }
        assert_eq!(guard.right_of("stranger"), None);
    }

    #[test]
    fn test_rejection_does_not_record_missing_right() {
        let mut owners = OwnerRegistry::new("deployer");
        owners.add_owners("deployer", &["restored"]).unwrap();
        let mut guard = TransferGuard::new();

        assert!(guard.authorize(&owners, "restored", 0, 100).is_err());
        assert!(guard.authorize(&owners, "restored", 101, 100).is_err());
        assert_eq!(guard.right_of("restored"), None);
        assert!(guard.rights().is_empty());

        guard.authorize(&owners, "restored", 50, 100).unwrap();
        assert_eq!(guard.right_of("restored"), Some(TransferRight::Consumed));
    }

    #[test]
    fn test_rejections_leave_right_unconsumed() {
        let (owners, mut guard) = setup();

        assert!(matches!(
            guard.authorize(&owners, "wallet1", 0, 100),
            Err(WalletError::InvalidAmount)
        ));
        assert!(matches!(
            guard.authorize(&owners, "wallet1", 101, 100),
            Err(WalletError::InsufficientBalance { have: 100, need: 101 })
        ));
        assert!(guard.has_unconsumed_right("wallet1"));

        // Exact balance is allowed
        guard.authorize(&owners, "wallet1", 100, 100).unwrap();
    }
}
