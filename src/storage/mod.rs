//! Storage module for wallet state persistence

pub mod persistence;

pub use persistence::{
    load_from_file, save_to_file, StateSnapshot, StorageConfig, StorageError, WalletStore,
};
