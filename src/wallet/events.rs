//! Wallet audit events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WalletEventKind {
    OwnerAdded { owner: String, by: String },
    OwnerRemoved { owner: String, by: String },
    OwnershipResigned { owner: String },
    /// A right was spent authorizing `amount`
    RightConsumed { owner: String, amount: u128 },
    TransferExecuted { owner: String, to: String, amount: u128 },
    TransferRejected { caller: String, to: String, amount: u128, reason: String },
    TransferFailed { owner: String, to: String, amount: u128, reason: String },
}

/// An entry in the wallet's event log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WalletEvent {
    pub kind: WalletEventKind,
    pub timestamp: DateTime<Utc>,
}

impl WalletEvent {
    pub fn now(kind: WalletEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}
