//! Balance ledger and the value-transfer primitive
//!
//! Provides account balances with a `send` operation that can run
//! recipient-controlled code.

use crate::ledger::receiver::{HookError, Receiver};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Base units per ether
pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// Default maximum nesting of receipt hooks
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Default number of transfer events kept in history
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Ledger-related errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Invalid address: cannot transfer to self")]
    SelfTransfer,
    #[error("Balance overflow: crediting {amount} to {account}")]
    BalanceOverflow { account: String, amount: u128 },
    #[error("Call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("Receipt hook of {to} failed: {source}")]
    HookFailed {
        to: String,
        #[source]
        source: HookError,
    },
}

/// The value-transfer primitive consumed by the wallet
///
/// `send` may run arbitrary code belonging to `to` before it returns,
/// including code that calls back into the caller of `send`.
pub trait ValueTransfer {
    fn send(&self, from: &str, to: &str, amount: u128) -> Result<TransferEvent, LedgerError>;

    fn balance_of(&self, address: &str) -> u128;
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum depth of nested receipt hooks
    pub max_call_depth: usize,
    /// Transfer events kept in history
    pub history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Transfer event (recorded when value moves)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransferEvent {
    pub from: String,
    pub to: String,
    pub amount: u128,
    /// Hook nesting level the send was issued from
    pub depth: usize,
    pub timestamp: DateTime<Utc>,
}

/// Serializable ledger state (receivers are not persisted)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    pub config: LedgerConfig,
    pub balances: BTreeMap<String, u128>,
    pub history: Vec<TransferEvent>,
}

/// State restored when a receipt hook fails
struct Checkpoint {
    balances: HashMap<String, u128>,
    history: VecDeque<TransferEvent>,
}

/// An in-process account ledger
///
/// Every method takes `&self` so a receipt hook can use the ledger while an
/// outer `send` is still running. No `RefCell` borrow is held across a hook.
pub struct Ledger {
    config: LedgerConfig,
    balances: RefCell<HashMap<String, u128>>,
    receivers: RefCell<HashMap<String, Rc<dyn Receiver>>>,
    history: RefCell<VecDeque<TransferEvent>>,
    depth: Cell<usize>,
}

impl Ledger {
    /// Create an empty ledger with default configuration
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Create an empty ledger with the given configuration
    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            balances: RefCell::new(HashMap::new()),
            receivers: RefCell::new(HashMap::new()),
            history: RefCell::new(VecDeque::new()),
            depth: Cell::new(0),
        }
    }

    /// Restore a ledger from a snapshot
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let ledger = Self::with_config(snapshot.config);
        *ledger.balances.borrow_mut() = snapshot.balances.into_iter().collect();
        *ledger.history.borrow_mut() = snapshot.history.into();
        ledger
    }

    /// Capture balances and history
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            config: self.config.clone(),
            balances: self
                .balances
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            history: self.history.borrow().iter().cloned().collect(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Credit new value to an account
    pub fn mint(&self, to: &str, amount: u128) -> Result<(), LedgerError> {
        let mut balances = self.balances.borrow_mut();
        let balance = balances.entry(to.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account: to.to_string(),
                amount,
            })?;
        log::debug!("Minted {} to {}", amount, to);
        Ok(())
    }

    /// Sum of all balances, saturating at `u128::MAX`
    pub fn total_supply(&self) -> u128 {
        self.balances
            .borrow()
            .values()
            .fold(0u128, |acc, b| acc.saturating_add(*b))
    }

    /// Attach a receipt hook to an account, replacing any previous one
    pub fn register_receiver(&self, address: &str, receiver: Rc<dyn Receiver>) {
        self.receivers
            .borrow_mut()
            .insert(address.to_string(), receiver);
    }

    /// Detach the receipt hook of an account
    pub fn unregister_receiver(&self, address: &str) -> bool {
        self.receivers.borrow_mut().remove(address).is_some()
    }

    pub fn has_receiver(&self, address: &str) -> bool {
        self.receivers.borrow().contains_key(address)
    }

    /// Current hook nesting level (0 outside any hook)
    pub fn call_depth(&self) -> usize {
        self.depth.get()
    }

    /// Recorded transfer events, oldest first
    pub fn history(&self) -> Vec<TransferEvent> {
        self.history.borrow().iter().cloned().collect()
    }

    /// Total value that left `address` according to the retained history
    pub fn total_sent_from(&self, address: &str) -> u128 {
        self.history
            .borrow()
            .iter()
            .filter(|e| e.from == address)
            .map(|e| e.amount)
            .sum()
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            balances: self.balances.borrow().clone(),
            history: self.history.borrow().clone(),
        }
    }

    fn revert(&self, checkpoint: Checkpoint) {
        *self.balances.borrow_mut() = checkpoint.balances;
        *self.history.borrow_mut() = checkpoint.history;
    }

    fn record(&self, event: TransferEvent) {
        let mut history = self.history.borrow_mut();
        history.push_back(event);
        while history.len() > self.config.history_limit {
            history.pop_front();
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let receivers: Vec<String> = self.receivers.borrow().keys().cloned().collect();
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("balances", &self.balances.borrow())
            .field("receivers", &receivers)
            .field("depth", &self.depth.get())
            .finish()
    }
}

impl ValueTransfer for Ledger {
    /// Move value and run the recipient's receipt hook
    ///
    /// The recipient is credited before its hook runs. If the hook fails,
    /// balances and history roll back to their state before this send,
    /// including any nested sends the hook made.
    fn send(&self, from: &str, to: &str, amount: u128) -> Result<TransferEvent, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        if from == to {
            return Err(LedgerError::SelfTransfer);
        }

        let depth = self.depth.get();
        if depth >= self.config.max_call_depth {
            return Err(LedgerError::CallDepthExceeded(self.config.max_call_depth));
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account: to.to_string(),
                amount,
            })?;

        let checkpoint = self.checkpoint();

        {
            let mut balances = self.balances.borrow_mut();
            balances.insert(from.to_string(), from_balance - amount);
            balances.insert(to.to_string(), credited);
        }

        let event = TransferEvent {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            depth,
            timestamp: Utc::now(),
        };
        self.record(event.clone());

        let receiver = self.receivers.borrow().get(to).cloned();
        if let Some(receiver) = receiver {
            log::debug!("Dispatching receipt hook of {} at depth {}", to, depth + 1);

            self.depth.set(depth + 1);
            let outcome = receiver.on_receive(self, from, amount);
            self.depth.set(depth);

            if let Err(source) = outcome {
                self.revert(checkpoint);
                log::warn!("Receipt hook of {} failed, send reverted: {}", to, source);
                return Err(LedgerError::HookFailed {
                    to: to.to_string(),
                    source,
                });
            }
        }

        Ok(event)
    }

    fn balance_of(&self, address: &str) -> u128 {
        *self.balances.borrow().get(address).unwrap_or(&0)
    }
}
