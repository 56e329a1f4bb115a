//! In-process value ledger
//!
//! Holds account balances and moves value between them. Moving value to an
//! account with a registered receiver runs that receiver's hook before the
//! send returns, and the hook may call back into whoever initiated the send.
//!
//! # Example
//!
//! ```rust
//! use guarded_wallet::ledger::{Ledger, ValueTransfer, ETHER};
//!
//! let ledger = Ledger::new();
//! ledger.mint("alice", 3 * ETHER).unwrap();
//!
//! ledger.send("alice", "bob", ETHER).unwrap();
//!
//! assert_eq!(ledger.balance_of("alice"), 2 * ETHER);
//! assert_eq!(ledger.balance_of("bob"), ETHER);
//! ```

pub mod ledger;
pub mod receiver;

pub use ledger::{
    Ledger, LedgerConfig, LedgerError, LedgerSnapshot, TransferEvent, ValueTransfer,
    DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_CALL_DEPTH, ETHER,
};
pub use receiver::{HookError, Receiver, RejectingReceiver};
