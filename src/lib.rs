//! Guarded Wallet: a multi-owner wallet with single-use transfer rights
//!
//! This crate provides:
//! - An owner registry where any owner can add, remove or resign owners
//! - A transfer guard that gives every owner exactly one outgoing transfer
//! - An in-process ledger whose receivers can call back into the sender
//! - Reentrant attacker receivers for exercising the guard
//! - JSON scenarios, a runner and persisted wallet state with backups
//!
//! # Example
//!
//! ```rust
//! use guarded_wallet::scenario::{Scenario, ScenarioRunner};
//! use guarded_wallet::ledger::ETHER;
//!
//! // Two owners, a hacker who calls back in while being paid
//! let runner = ScenarioRunner::new(Scenario::multi_attack()).unwrap();
//! let (report, _sim) = runner.run().unwrap();
//!
//! // Every reentry was refused; only wallet1's own transfer left the wallet
//! assert_eq!(report.final_balance, 2 * ETHER);
//! println!("{} of {} steps failed", report.failed_steps(), report.steps.len());
//! ```

pub mod cli;
pub mod crypto;
pub mod ledger;
pub mod scenario;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use ledger::{Ledger, LedgerConfig, LedgerError, Receiver, ValueTransfer, ETHER};
pub use scenario::{Scenario, ScenarioReport, ScenarioRunner};
pub use storage::{StateSnapshot, StorageConfig, StorageError, WalletStore};
pub use wallet::{
    GuardedWallet, OwnerRegistry, ReentrantReceiver, ReentryPlan, TransferGuard, TransferRight,
    WalletConfig, WalletError,
};
