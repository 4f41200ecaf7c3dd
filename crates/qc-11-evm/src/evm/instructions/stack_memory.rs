//! Stack, memory, storage and flow operations: 0x50-0x9F.

use super::push;
use crate::domain::fork::SstoreMetering;
use crate::errors::{ExceptionKind, VmError};
use crate::evm::gas::sstore_cost;
use crate::evm::host::{Control, Host};
use crate::evm::program::Program;
use crate::evm::word::{Word, WORD_BYTES};

/// POP
pub fn op_pop(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    program.stack_mut().pop()?;
    Ok(Control::Continue)
}

/// MLOAD
pub fn op_mload(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let offset = program.stack_mut().pop()?;
    let (offset, _) = program.charge_memory(offset, Word::from(WORD_BYTES), &host.rules.gas)?;
    let value = program.memory().read_word(offset);
    push(program, value)
}

/// MSTORE
pub fn op_mstore(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [offset, value] = program.stack_mut().pop_n::<2>()?;
    let (offset, _) = program.charge_memory(offset, Word::from(WORD_BYTES), &host.rules.gas)?;
    program.memory_mut().write_word(offset, value);
    Ok(Control::Continue)
}

/// MSTORE8
pub fn op_mstore8(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [offset, value] = program.stack_mut().pop_n::<2>()?;
    let (offset, _) = program.charge_memory(offset, Word::ONE, &host.rules.gas)?;
    program
        .memory_mut()
        .write_byte(offset, value.to_be_bytes()[WORD_BYTES - 1]);
    Ok(Control::Continue)
}

/// SLOAD
pub fn op_sload(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let key = program.stack_mut().pop()?;
    let value = program.storage_load(&*host.repo, key)?;
    push(program, value)
}

/// SSTORE, priced by the active metering scheme.
pub fn op_sstore(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    program.require_mutable()?;
    let [key, new] = program.stack_mut().pop_n::<2>()?;

    if host.rules.sstore_metering == SstoreMetering::NetWithSentry
        && program.gas_remaining() <= host.rules.gas.sstore_sentry
    {
        return Err(ExceptionKind::OutOfGas.into());
    }

    let address = program.env().address;
    let current = host.repo.get_storage_value(address, key)?;
    let original = host.repo.get_original_storage_value(address, key)?;
    let cost = sstore_cost(host.rules, original, current, new);

    program.spend_gas(cost.gas)?;
    program.add_refund(cost.refund);
    program.storage_store(host.repo, key, new)?;
    Ok(Control::Continue)
}

/// JUMP
pub fn op_jump(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let destination = program.stack_mut().pop()?;
    program.set_pc(destination)?;
    Ok(Control::Jump)
}

/// JUMPI
pub fn op_jumpi(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let [destination, condition] = program.stack_mut().pop_n::<2>()?;
    if condition.is_zero() {
        return Ok(Control::Continue);
    }
    program.set_pc(destination)?;
    Ok(Control::Jump)
}

/// PC: position of this instruction.
pub fn op_pc(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let pc = program.pc();
    push(program, pc)
}

/// MSIZE
pub fn op_msize(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let size = program.memory().size();
    push(program, size)
}

/// GAS: remaining gas after this instruction's own cost.
pub fn op_gas(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let gas = program.gas_remaining();
    push(program, gas)
}

/// JUMPDEST
pub fn op_jumpdest(_program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    Ok(Control::Continue)
}

/// PUSH1..PUSH32. Immediates running past the end of code read as zero.
pub fn op_push<const N: usize>(
    program: &mut Program,
    _host: &mut Host<'_>,
) -> Result<Control, VmError> {
    let start = program.pc() + 1;
    let code = program.code();
    let mut immediate = [0u8; N];
    if start < code.len() {
        let available = (code.len() - start).min(N);
        immediate[..available].copy_from_slice(&code[start..start + available]);
    }
    program.stack_mut().push(Word::from_be_slice(&immediate))?;
    program.advance(N);
    Ok(Control::Continue)
}

/// DUP1..DUP16
pub fn op_dup<const N: usize>(
    program: &mut Program,
    _host: &mut Host<'_>,
) -> Result<Control, VmError> {
    program.stack_mut().dup(N)?;
    Ok(Control::Continue)
}

/// SWAP1..SWAP16
pub fn op_swap<const N: usize>(
    program: &mut Program,
    _host: &mut Host<'_>,
) -> Result<Control, VmError> {
    program.stack_mut().swap(N)?;
    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fork::{Fork, ForkRules};
    use crate::domain::value_objects::Bytes;
    use crate::evm::instructions::test_support::Bench;
    use crate::evm::program::tests::invocation;

    #[test]
    fn test_mstore_mload_roundtrip_and_cost() {
        let mut bench = Bench::new().stack(&[0xDEAD, 0]);
        let before = bench.program.gas_remaining();
        bench.run(op_mstore).unwrap();
        assert_eq!(before - bench.program.gas_remaining(), 3);
        assert_eq!(bench.program.memory().size(), 32);

        let mut bench = bench.stack(&[0]);
        bench.run(op_mload).unwrap();
        assert_eq!(bench.top(), Word::from(0xDEADu64));
    }

    #[test]
    fn test_mstore8_writes_low_byte() {
        let mut bench = Bench::new().stack(&[0x1FF, 3]);
        bench.run(op_mstore8).unwrap();
        assert_eq!(bench.program.memory().read(0, 4), vec![0, 0, 0, 0xFF]);
    }

    #[test]
    fn test_mload_huge_offset_out_of_gas() {
        let mut bench = Bench::new();
        bench.program.stack_mut().push(Word::MAX).unwrap();
        let err = bench.run(op_mload).unwrap_err();
        assert_eq!(err.exception(), Some(ExceptionKind::OutOfGas));
    }

    #[test]
    fn test_push_reads_immediate_and_advances() {
        let code = Bytes::from_slice(&[0x61, 0x12, 0x34, 0x00]);
        let mut bench = Bench::with_env(invocation(), code);
        bench.run(op_push::<2>).unwrap();
        assert_eq!(bench.top(), Word::from(0x1234u64));
        assert_eq!(bench.program.pc(), 2);
    }

    #[test]
    fn test_push_truncated_immediate_pads_right() {
        let code = Bytes::from_slice(&[0x62, 0xAB]);
        let mut bench = Bench::with_env(invocation(), code);
        bench.run(op_push::<3>).unwrap();
        assert_eq!(bench.top(), Word::from(0xAB_0000u64));
    }

    #[test]
    fn test_dup_and_swap() {
        let mut bench = Bench::new().stack(&[1, 2, 3]);
        bench.run(op_dup::<3>).unwrap();
        assert_eq!(bench.top(), Word::ONE);
        bench.run(op_swap::<1>).unwrap();
        assert_eq!(bench.top(), Word::from(3u64));
        assert_eq!(bench.program.stack().peek(1).unwrap(), Word::ONE);
    }

    #[test]
    fn test_jump_rejects_non_jumpdest() {
        let code = Bytes::from_slice(&[0x60, 0x5B, 0x5B]);
        let mut bench = Bench::with_env(invocation(), code).stack(&[1]);
        let err = bench.run(op_jump).unwrap_err();
        assert_eq!(
            err.exception(),
            Some(ExceptionKind::InvalidJump { destination: 1 })
        );

        let mut bench = bench.stack(&[2]);
        assert!(matches!(bench.run(op_jump).unwrap(), Control::Jump));
        assert_eq!(bench.program.pc(), 2);
    }

    #[test]
    fn test_jumpi_false_falls_through() {
        let mut bench = Bench::new().stack(&[0, 99]);
        assert!(matches!(bench.run(op_jumpi).unwrap(), Control::Continue));
    }

    #[test]
    fn test_sstore_fresh_slot_costs_set() {
        let mut bench = Bench::new().stack(&[1, 0]);
        let before = bench.program.gas_remaining();
        bench.run(op_sstore).unwrap();
        assert_eq!(before - bench.program.gas_remaining(), 20_000);

        let mut bench = bench.stack(&[0]);
        bench.run(op_sload).unwrap();
        assert_eq!(bench.top(), Word::ONE);
    }

    #[test]
    fn test_sstore_sentry() {
        let mut bench = Bench::new();
        bench.program = Program::new(invocation(), Bytes::new(), 2_300);
        let mut bench = bench.stack(&[1, 0]);
        let err = bench.run(op_sstore).unwrap_err();
        assert_eq!(err.exception(), Some(ExceptionKind::OutOfGas));
    }

    #[test]
    fn test_sstore_legacy_clear_refund() {
        let mut bench = Bench::new();
        bench.rules = ForkRules::for_fork(Fork::Byzantium);
        let address = bench.program.env().address;
        bench.repo.set_storage(address, Word::ZERO, Word::ONE);
        let mut bench = bench.stack(&[0, 0]);
        let before = bench.program.gas_remaining();
        bench.run(op_sstore).unwrap();
        assert_eq!(before - bench.program.gas_remaining(), 5_000);
        assert_eq!(bench.program.refund(), 15_000);
    }

    #[test]
    fn test_sstore_static_frame() {
        let mut env = invocation();
        env.is_static = true;
        let mut bench = Bench::with_env(env, Bytes::new()).stack(&[1, 0]);
        let err = bench.run(op_sstore).unwrap_err();
        assert_eq!(err.exception(), Some(ExceptionKind::StaticCallStateChange));
    }
}
