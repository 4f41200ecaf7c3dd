//! # Instruction Handlers
//!
//! One function per opcode, all with the [`Handler`](super::host::Handler)
//! signature. Handlers run after the interpreter has checked stack arity and
//! charged the base cost, so stack pops here cannot fail on well-formed tables;
//! they only charge the dynamic part of their price.
//!
//! PUSH, DUP, SWAP and LOG are const-generic over their immediate/depth/topic
//! count.

pub mod arithmetic;
pub mod bitwise;
pub mod block;
pub mod environment;
pub mod logging;
pub mod stack_memory;
pub mod system;

use super::host::Control;
use super::program::Program;
use super::word::Word;
use crate::errors::VmError;

/// Pops one operand and pushes `op(a)`.
fn unary(program: &mut Program, op: impl FnOnce(Word) -> Word) -> Result<Control, VmError> {
    let a = program.stack_mut().pop()?;
    program.stack_mut().push(op(a))?;
    Ok(Control::Continue)
}

/// Pops two operands (top first) and pushes `op(a, b)`.
fn binary(program: &mut Program, op: impl FnOnce(Word, Word) -> Word) -> Result<Control, VmError> {
    let [a, b] = program.stack_mut().pop_n::<2>()?;
    program.stack_mut().push(op(a, b))?;
    Ok(Control::Continue)
}

/// Pops three operands (top first) and pushes `op(a, b, c)`.
fn ternary(
    program: &mut Program,
    op: impl FnOnce(Word, Word, Word) -> Word,
) -> Result<Control, VmError> {
    let [a, b, c] = program.stack_mut().pop_n::<3>()?;
    program.stack_mut().push(op(a, b, c))?;
    Ok(Control::Continue)
}

/// Pushes one value.
fn push(program: &mut Program, value: impl Into<Word>) -> Result<Control, VmError> {
    program.stack_mut().push(value.into())?;
    Ok(Control::Continue)
}
