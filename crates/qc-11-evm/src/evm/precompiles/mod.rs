//! # Precompiled Contracts
//!
//! Native contracts at the reserved addresses `0x01..=0x05`:
//!
//! | Address | Contract  | Price                          | Active     |
//! |---------|-----------|--------------------------------|------------|
//! | `0x01`  | ECRECOVER | 3000                           | Frontier   |
//! | `0x02`  | SHA256    | 60 + 12 per word               | Frontier   |
//! | `0x03`  | RIPEMD160 | 600 + 120 per word             | Frontier   |
//! | `0x04`  | IDENTITY  | 15 + 3 per word                | Frontier   |
//! | `0x05`  | MODEXP    | EIP-198 complexity / 20        | Byzantium  |
//!
//! The registry is built once per [`ForkRules`] and is immutable afterwards.
//! Running out of gas inside a precompile fails only the calling CALL.

pub mod ecrecover;
pub mod identity;
pub mod modexp;
pub mod ripemd160;
pub mod sha256;

use std::fmt;
use std::sync::Arc;

use crate::adapters::signature_adapter::K256Verifier;
use crate::domain::fork::ForkRules;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use crate::evm::gas::words;
use crate::ports::outbound::SignatureVerifier;

/// Result of a precompile that had enough gas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Gas charged.
    pub gas_used: u64,
    /// Output data.
    pub output: Bytes,
}

/// A precompiled contract.
pub trait Precompile: Send + Sync {
    /// Runs the contract on `input` with at most `gas_limit` gas.
    ///
    /// # Errors
    ///
    /// `OutOfGas` when the price exceeds `gas_limit`; malformed input that the
    /// contract rejects outright.
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError>;

    /// Reserved address of the contract.
    fn address(&self) -> Address;
}

/// `base + per_word * words(len)`.
#[must_use]
pub fn linear_cost(len: usize, base: u64, per_word: u64) -> u64 {
    base.saturating_add(per_word.saturating_mul(words(len)))
}

/// Charges `cost` against `gas_limit`.
///
/// # Errors
///
/// `OutOfGas` when unaffordable.
pub fn charge(cost: u64, gas_limit: u64) -> Result<u64, PrecompileError> {
    if cost > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }
    Ok(cost)
}

/// Address `0x00..00nn`.
#[must_use]
pub fn precompile_address(index: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = index;
    Address::new(bytes)
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Precompiles active under one set of rules, indexed by address.
#[derive(Clone)]
pub struct PrecompileRegistry {
    contracts: Vec<Arc<dyn Precompile>>,
}

impl PrecompileRegistry {
    /// Registry for `rules` using the built-in signature verifier.
    #[must_use]
    pub fn for_rules(rules: &ForkRules) -> Self {
        Self::with_verifier(rules, Arc::new(K256Verifier::new()))
    }

    /// Registry for `rules` with ECRECOVER backed by `verifier`.
    #[must_use]
    pub fn with_verifier(rules: &ForkRules, verifier: Arc<dyn SignatureVerifier>) -> Self {
        let all: [Arc<dyn Precompile>; 5] = [
            Arc::new(ecrecover::Ecrecover::new(verifier)),
            Arc::new(sha256::Sha256Precompile),
            Arc::new(ripemd160::Ripemd160Precompile),
            Arc::new(identity::Identity),
            Arc::new(modexp::ModExp),
        ];
        let count = usize::from(rules.precompile_count).min(all.len());
        Self {
            contracts: all.into_iter().take(count).collect(),
        }
    }

    /// Contract at `address`, if one is active there.
    #[must_use]
    pub fn get(&self, address: Address) -> Option<&dyn Precompile> {
        let index = usize::from(address.low_byte_index()?);
        if index == 0 {
            return None;
        }
        self.contracts.get(index - 1).map(AsRef::as_ref)
    }

    /// Returns true if `address` hosts an active precompile.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.get(address).is_some()
    }

    /// Addresses of every active precompile.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.contracts.iter().map(|contract| contract.address())
    }

    /// Number of active precompiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true if no precompile is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl fmt::Debug for PrecompileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.addresses()).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
