//! Deterministic address derivation
//!
//! The custody wallet gets a P2SH-style base58check address derived from
//! its initial owner set and threshold. The campaign gets a `0x` hex address
//! derived from its controller, beneficiary and window.

use crate::core::Address;
use crate::crypto::hash::{double_sha256, sha256};
use ripemd::{Digest, Ripemd160};

/// Version byte for wallet addresses (produces addresses starting with '3')
const WALLET_VERSION: u8 = 0x05;

/// Derive the custody wallet address
///
/// Address = Base58Check(version || RIPEMD160(SHA256(threshold || sorted owners)))
pub fn wallet_address(owners: &[Address], threshold: u32) -> Address {
    let mut sorted: Vec<&Address> = owners.iter().collect();
    sorted.sort();

    let mut script_data = threshold.to_be_bytes().to_vec();
    for owner in sorted {
        script_data.extend_from_slice(owner.as_bytes());
    }

    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(&script_data));
    let ripemd_hash = ripemd.finalize();

    let mut address_bytes = vec![WALLET_VERSION];
    address_bytes.extend_from_slice(&ripemd_hash);

    let checksum = double_sha256(&address_bytes);
    address_bytes.extend_from_slice(&checksum[..4]);

    Address::new(bs58::encode(address_bytes).into_string())
}

/// Derive the funding campaign address
pub fn campaign_address(
    controller: &Address,
    beneficiary: &Address,
    start_position: u64,
    end_position: u64,
) -> Address {
    let input = format!(
        "{}:{}:{}:{}",
        controller, beneficiary, start_position, end_position
    );
    let hex = hex::encode(sha256(input.as_bytes()));
    Address::new(format!("0x{}", &hex[..40]))
}
