//! Hashing and address derivation
//!
//! Wallet and account identities are opaque strings. Deployed wallets get a
//! deterministic `0x`-prefixed address derived from the deployer and a nonce.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest when deriving an address
pub const ADDRESS_HEX_LEN: usize = 40;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive a wallet address from its deployer and deployment nonce
///
/// Address = "0x" || hex(SHA256("deployer:nonce"))[..40]
pub fn derive_address(deployer: &str, nonce: u64) -> String {
    let input = format!("{}:{}", deployer, nonce);
    let hex = sha256_hex(input.as_bytes());
    format!("0x{}", &hex[..ADDRESS_HEX_LEN])
}

/// Pick a fresh deployment nonce
pub fn random_nonce() -> u64 {
    rand::thread_rng().gen()
}

/// Check that a string looks like a derived address
pub fn is_derived_address(address: &str) -> bool {
    address.len() == ADDRESS_HEX_LEN + 2
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
