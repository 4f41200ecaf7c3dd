//! Arithmetic: 0x01-0x0B.

use super::{binary, ternary};
use crate::evm::gas::exp_cost;
use crate::evm::host::{Control, Host};
use crate::evm::program::Program;
use crate::evm::word::Word;
use crate::errors::VmError;

/// ADD
pub fn op_add(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::add)
}

/// MUL
pub fn op_mul(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::mul)
}

/// SUB
pub fn op_sub(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::sub)
}

/// DIV
pub fn op_div(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::div)
}

/// SDIV
pub fn op_sdiv(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::sdiv)
}

/// MOD
pub fn op_mod(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::modulo)
}

/// SMOD
pub fn op_smod(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::smod)
}

/// ADDMOD
pub fn op_addmod(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    ternary(program, Word::addmod)
}

/// MULMOD
pub fn op_mulmod(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    ternary(program, Word::mulmod)
}

/// EXP, priced per byte of the exponent.
pub fn op_exp(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [base, exponent] = program.stack_mut().pop_n::<2>()?;
    program.spend_gas(exp_cost(&host.rules.gas, &exponent))?;
    program.stack_mut().push(base.exp(exponent))?;
    Ok(Control::Continue)
}

/// SIGNEXTEND
pub fn op_signextend(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    binary(program, Word::signextend)
}
