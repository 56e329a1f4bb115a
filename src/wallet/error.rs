//! Wallet errors

use crate::ledger::LedgerError;
use thiserror::Error;

/// Errors related to wallet operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Unauthorized: {0} is not an owner")]
    Unauthorized(String),
    #[error("Transfer right of {0} already consumed")]
    RightAlreadyConsumed(String),
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),
    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),
}

impl WalletError {
    /// Whether the call was refused before any value moved
    pub fn is_rejection(&self) -> bool {
        !matches!(self, WalletError::TransferFailed(_))
    }
}
