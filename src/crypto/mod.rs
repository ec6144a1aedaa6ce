//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing
//! - Operation selectors for transaction payloads
//! - Deterministic wallet and campaign addresses

pub mod address;
pub mod hash;

pub use address::{campaign_address, wallet_address};
pub use hash::{double_sha256, selector, sha256, sha256_hex, SELECTOR_LEN};
