//! # Identity Precompile (0x04)
//!
//! Returns its input unchanged.

use super::{charge, linear_cost, precompile_address, Precompile, PrecompileOutput};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;

/// Gas cost per word.
const IDENTITY_WORD_COST: u64 = 3;
/// Base gas cost.
const IDENTITY_BASE_COST: u64 = 15;

/// Identity precompile.
pub struct Identity;

impl Precompile for Identity {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let gas_used = charge(
            linear_cost(input.len(), IDENTITY_BASE_COST, IDENTITY_WORD_COST),
            gas_limit,
        )?;
        Ok(PrecompileOutput {
            gas_used,
            output: Bytes::from_slice(input),
        })
    }

    fn address(&self) -> Address {
        precompile_address(4)
    }
}
