//! Multi-owner wallet with one-shot transfer rights
//!
//! Every owner may move value out of the wallet exactly once. The right is
//! spent before value leaves, so a destination that calls back into the
//! wallet while receiving funds finds it already consumed.
//!
//! # Example
//!
//! ```rust
//! use guarded_wallet::ledger::{Ledger, ValueTransfer, ETHER};
//! use guarded_wallet::wallet::{GuardedWallet, WalletConfig, WalletError};
//!
//! let ledger = Ledger::new();
//! let wallet = GuardedWallet::deploy("deployer", 0, WalletConfig::default());
//! wallet.add_owners("deployer", &["wallet1", "wallet2"]).unwrap();
//! wallet.resign_ownership("deployer").unwrap();
//!
//! ledger.mint("deployer", 3 * ETHER).unwrap();
//! ledger.send("deployer", wallet.address(), 3 * ETHER).unwrap();
//!
//! wallet.transfer_to(&ledger, "wallet1", "alice", ETHER).unwrap();
//! assert_eq!(wallet.get_balance(&ledger), 2 * ETHER);
//!
//! let again = wallet.transfer_to(&ledger, "wallet1", "alice", ETHER);
//! assert!(matches!(again, Err(WalletError::RightAlreadyConsumed(_))));
//! ```

pub mod error;
pub mod events;
pub mod guard;
pub mod owners;
pub mod reentry;
pub mod wallet;

pub use error::WalletError;
pub use events::{WalletEvent, WalletEventKind};
pub use guard::{Authorization, TransferGuard, TransferRight};
pub use owners::OwnerRegistry;
pub use reentry::{FailurePolicy, ReentrantReceiver, ReentryAttempt, ReentryPlan};
pub use wallet::{GuardedWallet, WalletConfig, WalletSnapshot, DEFAULT_EVENT_HISTORY_LIMIT};
