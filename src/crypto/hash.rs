//! Hashing utilities
//!
//! Provides SHA-256 based hashing used for operation selectors and address
//! derivation.

use sha2::{Digest, Sha256};

/// Length of an operation selector in bytes
pub const SELECTOR_LEN: usize = 4;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Operation selector: first four bytes of SHA-256 over the canonical
/// signature with all whitespace removed, e.g. `addOwner(address)`.
pub fn selector(signature: &str) -> [u8; SELECTOR_LEN] {
    let canonical: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
    let hash = sha256(canonical.as_bytes());
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(&hash[..SELECTOR_LEN]);
    out
}
