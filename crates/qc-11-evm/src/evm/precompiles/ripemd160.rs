//! # RIPEMD160 Precompile (0x03)
//!
//! The 20-byte digest is returned right-aligned in a 32-byte word.

use super::{charge, linear_cost, precompile_address, Precompile, PrecompileOutput};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use ripemd::{Digest, Ripemd160};

/// Gas cost per word.
const RIPEMD160_WORD_COST: u64 = 120;
/// Base gas cost.
const RIPEMD160_BASE_COST: u64 = 600;

/// RIPEMD160 precompile.
pub struct Ripemd160Precompile;

impl Precompile for Ripemd160Precompile {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let gas_used = charge(
            linear_cost(input.len(), RIPEMD160_BASE_COST, RIPEMD160_WORD_COST),
            gas_limit,
        )?;
        let digest = Ripemd160::digest(input);
        let mut output = vec![0u8; 32];
        output[12..].copy_from_slice(&digest);
        Ok(PrecompileOutput {
            gas_used,
            output: Bytes::from_vec(output),
        })
    }

    fn address(&self) -> Address {
        precompile_address(3)
    }
}
