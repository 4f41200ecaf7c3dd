//! # EVM Gas Metering
//!
//! Dynamic gas components. Base costs live in the opcode table; everything
//! that depends on operands or state is computed here from the active
//! [`GasSchedule`] / [`ForkRules`].

use super::word::{Word, WORD_BYTES};
use crate::domain::fork::{ForkRules, GasSchedule, SstoreMetering};
use crate::errors::ExceptionKind;

/// Number of 32-byte words covering `size` bytes.
#[must_use]
pub fn words(size: usize) -> u64 {
    size.div_ceil(WORD_BYTES) as u64
}

/// Per-word copy cost of CALLDATACOPY, CODECOPY, EXTCODECOPY, RETURNDATACOPY.
#[must_use]
pub fn copy_cost(schedule: &GasSchedule, size: usize) -> u64 {
    schedule.copy_word.saturating_mul(words(size))
}

/// Hashing cost on top of the SHA3 base (also CREATE2 init-code hashing).
#[must_use]
pub fn sha3_word_cost(schedule: &GasSchedule, size: usize) -> u64 {
    schedule.sha3_word.saturating_mul(words(size))
}

/// EXP cost on top of the base, by exponent byte length.
#[must_use]
pub fn exp_cost(schedule: &GasSchedule, exponent: &Word) -> u64 {
    schedule.exp_byte.saturating_mul(exponent.byte_len())
}

/// LOG data cost on top of the base and topic charges.
#[must_use]
pub fn log_data_cost(schedule: &GasSchedule, size: usize) -> u64 {
    schedule.log_data.saturating_mul(size as u64)
}

/// Code deposit cost for a successful creation.
#[must_use]
pub fn code_deposit_cost(schedule: &GasSchedule, code_len: usize) -> u64 {
    schedule.code_deposit_byte.saturating_mul(code_len as u64)
}

// =============================================================================
// CALL GAS
// =============================================================================

/// `gas - gas / divisor`: the most a frame may hand to a child (EIP-150).
#[must_use]
pub fn all_but_one_64th(gas: u64, divisor: u64) -> u64 {
    gas - gas / divisor.max(1)
}

/// Gas a CALL-family or CREATE opcode forwards to its child, before the
/// stipend.
///
/// With `limit_call_gas` the request is capped at all-but-1/64th of
/// `available`. Without it the full request must be affordable.
///
/// # Errors
///
/// `OutOfGas` when the uncapped request exceeds `available`.
pub fn forwarded_gas(rules: &ForkRules, available: u64, requested: Word) -> Result<u64, ExceptionKind> {
    if rules.limit_call_gas {
        let cap = all_but_one_64th(available, rules.gas.call_gas_divisor);
        return Ok(requested.saturating_u64().min(cap));
    }
    let requested = requested.to_u64()?;
    if requested > available {
        return Err(ExceptionKind::OutOfGas);
    }
    Ok(requested)
}

// =============================================================================
// SSTORE
// =============================================================================

/// Price of one SSTORE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SstoreCost {
    /// Gas charged.
    pub gas: u64,
    /// Change to the refund counter.
    pub refund: i64,
}

/// Prices a write of `new` over `current`, where `original` is the slot value
/// at the start of the transaction.
#[must_use]
pub fn sstore_cost(rules: &ForkRules, original: Word, current: Word, new: Word) -> SstoreCost {
    let gas = &rules.gas;
    let clear = signed(gas.sstore_clear_refund);

    if rules.sstore_metering == SstoreMetering::Legacy {
        let cost = if current.is_zero() && !new.is_zero() {
            gas.sstore_set
        } else {
            gas.sstore_reset
        };
        let refund = if !current.is_zero() && new.is_zero() { clear } else { 0 };
        return SstoreCost { gas: cost, refund };
    }

    if current == new {
        return SstoreCost {
            gas: gas.sstore_noop,
            refund: 0,
        };
    }

    if original == current {
        if original.is_zero() {
            return SstoreCost {
                gas: gas.sstore_set,
                refund: 0,
            };
        }
        let refund = if new.is_zero() { clear } else { 0 };
        return SstoreCost {
            gas: gas.sstore_reset,
            refund,
        };
    }

    // Dirty slot.
    let mut refund = 0;
    if !original.is_zero() {
        if current.is_zero() {
            refund -= clear;
        } else if new.is_zero() {
            refund += clear;
        }
    }
    if original == new {
        refund += if original.is_zero() {
            signed(gas.sstore_set) - signed(gas.sstore_noop)
        } else {
            signed(gas.sstore_reset) - signed(gas.sstore_noop)
        };
    }
    SstoreCost {
        gas: gas.sstore_noop,
        refund,
    }
}

// =============================================================================
// GAS REFUND
// =============================================================================

/// Refund actually paid back: the counter clamped at zero, capped at half the
/// gas used.
#[must_use]
pub fn capped_refund(gas_used: u64, refund: i64) -> u64 {
    let refund = u64::try_from(refund).unwrap_or(0);
    refund.min(gas_used / 2)
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// =============================================================================
// TESTS
// =============================================================================
