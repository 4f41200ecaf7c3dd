//! # Domain Services
//!
//! Pure, deterministic helpers: hashing, contract address derivation and the
//! intrinsic cost of a transaction.

use crate::domain::fork::GasSchedule;
use crate::domain::value_objects::{Address, Hash};
use sha3::{Digest, Keccak256};

/// Keccak-256 of empty input (code hash of accounts without code).
pub const EMPTY_CODE_HASH: Hash = Hash([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
    0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
    0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

// =============================================================================
// KECCAK256 UTILITY
// =============================================================================

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Address of a contract created with CREATE.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let mut content = Vec::with_capacity(30);

    // 20-byte string header: 0x80 + 20
    content.push(0x94);
    content.extend_from_slice(sender.as_bytes());

    if nonce == 0 {
        content.push(0x80);
    } else if nonce < 0x80 {
        content.extend_from_slice(&nonce.to_be_bytes()[7..]);
    } else {
        let be = nonce.to_be_bytes();
        let nonce_bytes = trim_leading_zeros(&be);
        content.push(0x80 + nonce_bytes.len() as u8);
        content.extend_from_slice(nonce_bytes);
    }

    // Payload is at most 30 bytes, always a short list.
    let mut rlp = Vec::with_capacity(content.len() + 1);
    rlp.push(0xc0 + content.len() as u8);
    rlp.extend_from_slice(&content);

    address_from_hash(&keccak256(&rlp))
}

/// Address of a contract created with CREATE2.
///
/// Address = keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))\[12:\]
#[must_use]
pub fn compute_contract_address_create2(sender: Address, salt: &[u8; 32], init_code: &[u8]) -> Address {
    let code_hash = keccak256(init_code);

    let mut data = Vec::with_capacity(85);
    data.push(0xff);
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(salt);
    data.extend_from_slice(code_hash.as_bytes());

    address_from_hash(&keccak256(&data))
}

fn address_from_hash(hash: &Hash) -> Address {
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.as_bytes()[12..]);
    Address::new(addr)
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

// =============================================================================
// INTRINSIC GAS
// =============================================================================

/// Gas charged before any bytecode runs.
#[must_use]
pub fn intrinsic_gas(data: &[u8], is_contract_creation: bool, schedule: &GasSchedule) -> u64 {
    let base = if is_contract_creation {
        schedule.tx_create
    } else {
        schedule.tx
    };

    let data_gas: u64 = data
        .iter()
        .map(|&byte| {
            if byte == 0 {
                schedule.tx_data_zero
            } else {
                schedule.tx_data_non_zero
            }
        })
        .sum();

    base + data_gas
}

// =============================================================================
// TESTS
// =============================================================================
