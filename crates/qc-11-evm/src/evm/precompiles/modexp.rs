//! # ModExp Precompile (0x05)
//!
//! Arbitrary-precision modular exponentiation, priced per EIP-198.
//!
//! Input format:
//! - bytes 0-31: length of base (Bsize)
//! - bytes 32-63: length of exponent (Esize)
//! - bytes 64-95: length of modulus (Msize)
//! - then base, exponent and modulus, big-endian, zero-padded on the right
//!   when the input is short.

use super::{charge, precompile_address, Precompile, PrecompileOutput};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::PrecompileError;
use num::{BigUint, Zero};

const HEADER_LEN: usize = 96;
const GAS_DIVISOR: u64 = 20;
const EXPONENT_BYTE_MULTIPLIER: u64 = 8;

/// ModExp precompile.
pub struct ModExp;

impl Precompile for ModExp {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let base_len = read_length(input, 0);
        let exp_len = read_length(input, 32);
        let mod_len = read_length(input, 64);

        let body = input.get(HEADER_LEN..).unwrap_or_default();
        let exp_head = exponent_head(body, base_len, exp_len);
        let gas_used = charge(gas_cost(base_len, exp_len, mod_len, &exp_head), gas_limit)?;

        if base_len.is_zero() && mod_len.is_zero() {
            return Ok(PrecompileOutput {
                gas_used,
                output: Bytes::new(),
            });
        }

        let to_usize = |len: U256| usize::try_from(len).map_err(|_| PrecompileError::OutOfGas);
        let base_len = to_usize(base_len)?;
        let exp_len = to_usize(exp_len)?;
        let mod_len = to_usize(mod_len)?;

        let base = BigUint::from_bytes_be(&right_padded(body, 0, base_len));
        let exponent = BigUint::from_bytes_be(&right_padded(body, base_len, exp_len));
        let modulus = BigUint::from_bytes_be(&right_padded(
            body,
            base_len.saturating_add(exp_len),
            mod_len,
        ));

        let mut output = vec![0u8; mod_len];
        if !modulus.is_zero() {
            let result = base.modpow(&exponent, &modulus).to_bytes_be();
            // to_bytes_be of zero is [0]; it still fits.
            let start = mod_len.saturating_sub(result.len());
            output[start..].copy_from_slice(&result[result.len().saturating_sub(mod_len)..]);
        }

        Ok(PrecompileOutput {
            gas_used,
            output: Bytes::from_vec(output),
        })
    }

    fn address(&self) -> Address {
        precompile_address(5)
    }
}

/// EIP-198 price: `complexity(max(Bsize, Msize)) * max(adjusted_exp_len, 1) / 20`,
/// saturating at `u64::MAX`.
#[must_use]
pub fn gas_cost(base_len: U256, exp_len: U256, mod_len: U256, exp_head: &U256) -> u64 {
    let complexity = mult_complexity(base_len.max(mod_len));
    let iterations = U256::from(iteration_count(exp_len, exp_head));
    let gas = complexity
        .checked_mul(iterations)
        .map_or(U256::MAX, |product| product / U256::from(GAS_DIVISOR));
    if gas > U256::from(u64::MAX) {
        u64::MAX
    } else {
        gas.as_u64()
    }
}

fn mult_complexity(len: U256) -> U256 {
    // Beyond this every price is unpayable anyway.
    if len > U256::from(u64::from(u32::MAX)) {
        return U256::MAX;
    }
    let x = len;
    if x <= U256::from(64) {
        x * x
    } else if x <= U256::from(1024) {
        x * x / 4 + U256::from(96) * x - U256::from(3072)
    } else {
        x * x / 16 + U256::from(480) * x - U256::from(199_680)
    }
}

fn iteration_count(exp_len: U256, exp_head: &U256) -> u64 {
    let head_bits = exp_head.bits() as u64;
    let count = if exp_len <= U256::from(32) {
        head_bits.saturating_sub(1)
    } else {
        let extra = exp_len - U256::from(32);
        let extra = if extra > U256::from(u64::MAX) {
            u64::MAX
        } else {
            extra.as_u64()
        };
        EXPONENT_BYTE_MULTIPLIER
            .saturating_mul(extra)
            .saturating_add(head_bits.max(1) - 1)
    };
    count.max(1)
}

fn read_length(input: &[u8], offset: usize) -> U256 {
    U256::from_big_endian(&right_padded(input, offset, 32))
}

/// First `min(Esize, 32)` bytes of the exponent as a number.
fn exponent_head(body: &[u8], base_len: U256, exp_len: U256) -> U256 {
    let Ok(base_len) = usize::try_from(base_len) else {
        return U256::zero();
    };
    let head_len = if exp_len < U256::from(32) {
        exp_len.as_usize()
    } else {
        32
    };
    U256::from_big_endian(&right_padded(body, base_len, head_len))
}

fn right_padded(data: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < data.len() {
        let available = (data.len() - offset).min(len);
        out[..available].copy_from_slice(&data[offset..offset + available]);
    }
    out
}
