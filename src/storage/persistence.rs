//! Wallet state persistence
//!
//! Provides save/load functionality for wallet and ledger state.

use crate::ledger::{Ledger, LedgerSnapshot};
use crate::wallet::{GuardedWallet, WalletSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Everything needed to bring a wallet back
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StateSnapshot {
    pub wallet: WalletSnapshot,
    pub ledger: LedgerSnapshot,
    pub saved_at: DateTime<Utc>,
}

impl StateSnapshot {
    /// Capture a wallet together with the ledger holding its funds
    pub fn capture(wallet: &GuardedWallet, ledger: &Ledger) -> Self {
        Self {
            wallet: wallet.snapshot(),
            ledger: ledger.snapshot(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuild the wallet and ledger (receipt hooks are not restored)
    pub fn restore(self) -> (GuardedWallet, Ledger) {
        (
            GuardedWallet::from_snapshot(self.wallet),
            Ledger::from_snapshot(self.ledger),
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".wallet_data"),
            state_file: "wallet_state.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Wallet state storage manager
pub struct WalletStore {
    config: StorageConfig,
}

impl WalletStore {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        if config.max_backups == 0 && config.backup_enabled {
            return Err(StorageError::InvalidData(
                "backups enabled but max_backups is 0".to_string(),
            ));
        }
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    /// Save a snapshot to disk
    pub fn save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.config.backup_enabled && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.state_file));
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, snapshot)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::info!("Saved wallet {} to {:?}", snapshot.wallet.address, path);
        Ok(())
    }

    /// Load the saved snapshot
    pub fn load(&self) -> Result<StateSnapshot, StorageError> {
        let path = self.state_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Wallet state file not found".to_string(),
            ));
        }

        load_from_file(&path)
    }

    /// Check if a saved snapshot exists
    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Delete the saved snapshot
    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.state_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Load a backup and make it the current state
    pub fn restore_backup(&self, backup_index: usize) -> Result<StateSnapshot, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        let snapshot = load_from_file(&backup_path)?;
        fs::copy(&backup_path, self.state_path())?;

        log::info!("Restored wallet state from backup {}", backup_index);
        Ok(snapshot)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }
}

/// Save a snapshot to a specific file path
pub fn save_to_file(snapshot: &StateSnapshot, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, snapshot)?;
    Ok(())
}

/// Load a snapshot from a specific file path
pub fn load_from_file(path: &Path) -> Result<StateSnapshot, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: StateSnapshot = serde_json::from_reader(reader)?;
    Ok(snapshot)
}
