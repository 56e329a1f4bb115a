//! Cryptographic utilities
//!
//! This module provides SHA-256 hashing and deterministic address
//! derivation for deployed wallets.

pub mod hash;

pub use hash::{derive_address, is_derived_address, random_nonce, sha256, sha256_hex};
