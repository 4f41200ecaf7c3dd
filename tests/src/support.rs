//! # Shared Fixtures
//!
//! Accounts, funded repositories and message helpers used by the integration
//! flows and the benchmarks.

use qc_11_evm::prelude::*;

/// Externally owned account sending every test transaction.
#[must_use]
pub fn sender() -> Address {
    Address::from_low_u64(0x5E4D)
}

/// A funded repository with `contracts` deployed at their addresses.
#[must_use]
pub fn repo_with(contracts: &[(Address, &[u8])]) -> InMemoryRepository {
    let mut repo = InMemoryRepository::new();
    repo.set_balance(sender(), U256::from(10u64).pow(U256::from(18)));
    for (address, code) in contracts {
        repo.set_code(*address, Bytes::from_slice(code));
    }
    repo
}

/// Message call from [`sender`] with no value.
#[must_use]
pub fn call_to(to: Address, data: &[u8], gas_limit: u64) -> Message {
    Message::call(sender(), to, U256::zero(), Bytes::from_slice(data), gas_limit)
}

/// The `index`th 32-byte word of `output`.
#[must_use]
pub fn word_at(output: &Bytes, index: usize) -> Word {
    let start = index * 32;
    Word::from_be_slice(&output.as_slice()[start..start + 32])
}

/// Storage slot `key` of `address`.
#[must_use]
pub fn slot(repo: &InMemoryRepository, address: Address, key: u64) -> Word {
    repo.get_storage_value(address, Word::from(key))
        .unwrap_or(Word::ZERO)
}

/// Init code that deploys `runtime` verbatim (at most 255 bytes).
#[must_use]
pub fn deployer(runtime: &[u8]) -> Vec<u8> {
    let len = u8::try_from(runtime.len()).unwrap_or(u8::MAX);
    // PUSH1 len PUSH1 12 PUSH1 0 CODECOPY PUSH1 len PUSH1 0 RETURN
    let mut code = vec![
        0x60, len, 0x60, 0x0C, 0x60, 0x00, 0x39, 0x60, len, 0x60, 0x00, 0xF3,
    ];
    code.extend_from_slice(runtime);
    code
}
