//! Receipt hooks
//!
//! A receiver is code owned by a destination account that runs while value
//! is being delivered to it.

use crate::ledger::Ledger;
use std::cell::Cell;

/// Error returned by a receipt hook to refuse a transfer
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Code that runs when an account receives value
///
/// The hook gets the ledger that is executing the send, so it can issue
/// further sends or call back into the sender before the outer send returns.
pub trait Receiver {
    fn on_receive(&self, ledger: &Ledger, from: &str, amount: u128) -> Result<(), HookError>;
}

/// A receiver that refuses every incoming transfer
#[derive(Debug, Default)]
pub struct RejectingReceiver {
    refused: Cell<u64>,
}

impl RejectingReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transfers refused so far
    pub fn refused(&self) -> u64 {
        self.refused.get()
    }
}

impl Receiver for RejectingReceiver {
    fn on_receive(&self, _ledger: &Ledger, from: &str, amount: u128) -> Result<(), HookError> {
        self.refused.set(self.refused.get() + 1);
        Err(format!("refusing {} from {}", amount, from).into())
    }
}
