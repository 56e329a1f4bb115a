//! Reentrant receiver
//!
//! A destination whose receipt hook calls back into the wallet that is
//! paying it, impersonating a chosen owner. Used to exercise the transfer
//! guard against reentrancy.

use crate::ledger::{HookError, Ledger, Receiver};
use crate::wallet::error::WalletError;
use crate::wallet::wallet::GuardedWallet;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// What the hook does when its nested call fails
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Refuse the incoming transfer, reverting it
    Revert,
    /// Keep the incoming funds and carry on
    Swallow,
}

/// How to re-enter the wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReentryPlan {
    /// Owner identity used for the nested `transfer_to`
    pub caller: String,
    /// Amount requested by each nested call
    pub amount: u128,
    /// How many nested calls to make in total
    pub max_reentries: u32,
    pub on_failure: FailurePolicy,
}

/// Record of one nested call
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReentryAttempt {
    pub caller: String,
    pub amount: u128,
    /// Hook nesting level the attempt was made from
    pub depth: usize,
    /// `None` on success, the error message otherwise
    pub error: Option<String>,
}

impl ReentryAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A receiver that re-enters the paying wallet
#[derive(Debug)]
pub struct ReentrantReceiver {
    address: String,
    wallet: Rc<GuardedWallet>,
    plan: RefCell<ReentryPlan>,
    remaining: Cell<u32>,
    attempts: RefCell<Vec<ReentryAttempt>>,
}

impl ReentrantReceiver {
    pub fn new(address: &str, wallet: Rc<GuardedWallet>, plan: ReentryPlan) -> Self {
        let remaining = plan.max_reentries;
        Self {
            address: address.to_string(),
            wallet,
            plan: RefCell::new(plan),
            remaining: Cell::new(remaining),
            attempts: RefCell::new(Vec::new()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Replace the plan and reset the reentry budget
    pub fn arm(&self, plan: ReentryPlan) {
        self.remaining.set(plan.max_reentries);
        *self.plan.borrow_mut() = plan;
    }

    /// Stop re-entering
    pub fn disarm(&self) {
        self.remaining.set(0);
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.get()
    }

    pub fn attempts(&self) -> Vec<ReentryAttempt> {
        self.attempts.borrow().clone()
    }

    fn reenter(&self, ledger: &Ledger, plan: &ReentryPlan) -> Result<(), WalletError> {
        self.wallet
            .transfer_to(ledger, &plan.caller, &self.address, plan.amount)
            .map(|_| ())
    }
}

impl Receiver for ReentrantReceiver {
    fn on_receive(&self, ledger: &Ledger, from: &str, _amount: u128) -> Result<(), HookError> {
        if from != self.wallet.address() || self.remaining.get() == 0 {
            return Ok(());
        }
        self.remaining.set(self.remaining.get() - 1);

        let plan = self.plan.borrow().clone();
        let depth = ledger.call_depth();
        log::debug!(
            "{} re-entering {} as {} for {} at depth {}",
            self.address,
            self.wallet.address(),
            plan.caller,
            plan.amount,
            depth
        );

        let result = self.reenter(ledger, &plan);

        self.attempts.borrow_mut().push(ReentryAttempt {
            caller: plan.caller.clone(),
            amount: plan.amount,
            depth,
            error: result.as_ref().err().map(|e| e.to_string()),
        });

        match (result, plan.on_failure) {
            (Ok(()), _) => Ok(()),
            (Err(e), FailurePolicy::Revert) => Err(e.into()),
            (Err(e), FailurePolicy::Swallow) => {
                log::debug!("{} ignoring failed reentry: {}", self.address, e);
                Ok(())
            }
        }
    }
}
