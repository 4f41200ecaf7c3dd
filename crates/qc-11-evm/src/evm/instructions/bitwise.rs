//! Comparison, bitwise logic and hashing: 0x10-0x20.

use super::{binary, unary};
use crate::domain::services::keccak256;
use crate::evm::gas::sha3_word_cost;
use crate::evm::host::{Control, Host};
use crate::evm::program::Program;
use crate::evm::word::Word;
use crate::errors::VmError;

/// LT
pub fn op_lt(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, |a, b| Word::from(a.lt(&b)))
}

/// GT
pub fn op_gt(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, |a, b| Word::from(a.gt(&b)))
}

/// SLT
pub fn op_slt(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, |a, b| Word::from(a.slt(&b)))
}

/// SGT
pub fn op_sgt(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, |a, b| Word::from(a.sgt(&b)))
}

/// EQ
pub fn op_eq(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, |a, b| Word::from(a == b))
}

/// ISZERO
pub fn op_iszero(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    unary(program, |a| Word::from(a.is_zero()))
}

/// AND
pub fn op_and(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::and)
}

/// OR
pub fn op_or(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::or)
}

/// XOR
pub fn op_xor(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::xor)
}

/// NOT
pub fn op_not(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    unary(program, Word::not)
}

/// BYTE
pub fn op_byte(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::byte)
}

/// SHL
pub fn op_shl(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::shl)
}

/// SHR
pub fn op_shr(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::shr)
}

/// SAR
pub fn op_sar(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::sar)
}

/// SHA3: Keccak-256 of a memory span.
pub fn op_sha3(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [offset, size] = program.stack_mut().pop_n::<2>()?;
    let (offset, size) = program.charge_memory(offset, size, &host.rules.gas)?;
    program.spend_gas(sha3_word_cost(&host.rules.gas, size))?;

    let data = program.memory().read(offset, size);
    let hash = keccak256(&data);
    program
        .stack_mut()
        .push(Word::from_be_bytes(*hash.as_bytes()))?;
    Ok(Control::Continue)
}
