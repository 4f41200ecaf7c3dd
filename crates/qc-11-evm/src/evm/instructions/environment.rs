//! Environmental information: 0x30-0x3F.
//!
//! Source offsets of the *COPY family and CALLDATALOAD saturate and read zeros
//! past the end of their source; destination spans are charged as memory.

use super::push;
use crate::errors::{ExceptionKind, VmError};
use crate::evm::gas::copy_cost;
use crate::evm::host::{Control, Host};
use crate::evm::program::Program;
use crate::evm::word::{Word, WORD_BYTES};

/// ADDRESS
pub fn op_address(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let address = program.env().address;
    push(program, address)
}

/// BALANCE
pub fn op_balance(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let address = program.stack_mut().pop()?.to_address();
    let balance = host.repo.get_balance(address)?;
    push(program, balance)
}

/// ORIGIN
pub fn op_origin(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let origin = program.env().origin;
    push(program, origin)
}

/// CALLER
pub fn op_caller(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let caller = program.env().caller;
    push(program, caller)
}

/// CALLVALUE
pub fn op_callvalue(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let value = program.env().value;
    push(program, value)
}

/// CALLDATALOAD
pub fn op_calldataload(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let offset = program.stack_mut().pop()?.saturating_usize();
    let word = program.env().data.padded_slice(offset, WORD_BYTES);
    push(program, Word::from_be_slice(&word))
}

/// CALLDATASIZE
pub fn op_calldatasize(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let size = program.env().data.len();
    push(program, size)
}

/// CALLDATACOPY
pub fn op_calldatacopy(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [dest, source, size] = program.stack_mut().pop_n::<3>()?;
    let (dest, size) = charge_copy(program, host, dest, size)?;
    if size > 0 {
        let data = program.env().data.padded_slice(source.saturating_usize(), size);
        program.memory_mut().write(dest, &data);
    }
    Ok(Control::Continue)
}

/// CODESIZE
pub fn op_codesize(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let size = program.code().len();
    push(program, size)
}

/// CODECOPY
pub fn op_codecopy(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [dest, source, size] = program.stack_mut().pop_n::<3>()?;
    let (dest, size) = charge_copy(program, host, dest, size)?;
    if size > 0 {
        let data = padded(program.code(), source.saturating_usize(), size);
        program.memory_mut().write(dest, &data);
    }
    Ok(Control::Continue)
}

/// GASPRICE
pub fn op_gasprice(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let price = program.env().gas_price;
    push(program, price)
}

/// EXTCODESIZE
pub fn op_extcodesize(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let address = program.stack_mut().pop()?.to_address();
    let size = host.repo.get_code(address)?.len();
    push(program, size)
}

/// EXTCODECOPY
pub fn op_extcodecopy(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [address, dest, source, size] = program.stack_mut().pop_n::<4>()?;
    let (dest, size) = charge_copy(program, host, dest, size)?;
    if size > 0 {
        let code = host.repo.get_code(address.to_address())?;
        let data = code.padded_slice(source.saturating_usize(), size);
        program.memory_mut().write(dest, &data);
    }
    Ok(Control::Continue)
}

/// RETURNDATASIZE
pub fn op_returndatasize(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let size = program.return_data().len();
    push(program, size)
}

/// RETURNDATACOPY. Unlike the other copies, reading past the end of the
/// buffer is an exception.
pub fn op_returndatacopy(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let [dest, source, size] = program.stack_mut().pop_n::<3>()?;

    let available = program.return_data().len();
    let offset = source.saturating_u64();
    let length = size.saturating_u64();
    let in_bounds = offset
        .checked_add(length)
        .is_some_and(|end| end <= available as u64);
    if !in_bounds {
        return Err(ExceptionKind::ReturnDataOutOfBounds {
            offset,
            size: length,
            available,
        }
        .into());
    }

    let (dest, size) = charge_copy(program, host, dest, size)?;
    if size > 0 {
        let data = program.return_data().padded_slice(source.saturating_usize(), size);
        program.memory_mut().write(dest, &data);
    }
    Ok(Control::Continue)
}

/// EXTCODEHASH. Zero for accounts that are absent or empty.
pub fn op_extcodehash(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let address = program.stack_mut().pop()?.to_address();
    let hash = if host.repo.is_empty(address)? {
        Word::ZERO
    } else {
        Word::from_be_bytes(*host.repo.get_code_hash(address)?.as_bytes())
    };
    push(program, hash)
}

/// Charges memory expansion plus per-word copy cost for the requested length,
/// regardless of how much source data exists.
fn charge_copy(
    program: &mut Program,
    host: &Host<'_>,
    dest: Word,
    size: Word,
) -> Result<(usize, usize), VmError> {
    let (dest, size) = program.charge_memory(dest, size, &host.rules.gas)?;
    program.spend_gas(copy_cost(&host.rules.gas, size))?;
    Ok((dest, size))
}

fn padded(source: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < source.len() {
        let available = (source.len() - offset).min(len);
        out[..available].copy_from_slice(&source[offset..offset + available]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Address, Bytes, U256};
    use crate::evm::instructions::test_support::Bench;
    use crate::evm::program::tests::invocation;
    use crate::ports::outbound::Repository;

    fn calldata_bench() -> Bench {
        let mut env = invocation();
        let mut data = vec![0xA1; 32];
        data.extend_from_slice(&[0xB1; 32]);
        env.data = Bytes::from_vec(data);
        Bench::with_env(env, Bytes::new())
    }

    #[test]
    fn test_calldataload_second_word() {
        let mut bench = calldata_bench().stack(&[0x20]);
        bench.run(op_calldataload).unwrap();
        assert_eq!(bench.top(), Word::from_be_bytes([0xB1; 32]));
    }

    #[test]
    fn test_calldataload_last_byte() {
        let mut bench = calldata_bench().stack(&[63]);
        bench.run(op_calldataload).unwrap();
        let mut expected = [0u8; 32];
        expected[0] = 0xB1;
        assert_eq!(bench.top(), Word::from_be_bytes(expected));
    }

    #[test]
    fn test_calldataload_huge_offset_reads_zero() {
        let mut bench = calldata_bench();
        bench.program.stack_mut().push(Word::MAX).unwrap();
        bench.run(op_calldataload).unwrap();
        assert_eq!(bench.top(), Word::ZERO);
    }

    #[test]
    fn test_calldatasize_costs_nothing_extra() {
        let mut bench = calldata_bench();
        let before = bench.program.gas_remaining();
        bench.run(op_calldatasize).unwrap();
        assert_eq!(bench.top(), Word::from(64u64));
        assert_eq!(bench.program.gas_remaining(), before);
    }

    #[test]
    fn test_calldatacopy_zero_fills_past_end() {
        // copy 40 bytes from calldata offset 48 to memory 0
        let mut bench = calldata_bench().stack(&[40, 48, 0]);
        let before = bench.program.gas_remaining();
        bench.run(op_calldatacopy).unwrap();

        let memory = bench.program.memory().read(0, 40);
        assert_eq!(&memory[..16], &[0xB1; 16]);
        assert_eq!(&memory[16..], &[0u8; 24]);
        // 2 words of memory (6) + 2 words copied (6)
        assert_eq!(before - bench.program.gas_remaining(), 12);
    }

    #[test]
    fn test_codecopy() {
        let code = Bytes::from_slice(&[0x60, 0x01, 0x00]);
        let mut bench = Bench::with_env(invocation(), code).stack(&[4, 1, 0]);
        bench.run(op_codecopy).unwrap();
        assert_eq!(bench.program.memory().read(0, 4), vec![0x01, 0x00, 0, 0]);
    }

    #[test]
    fn test_returndatacopy_out_of_bounds() {
        let mut bench = Bench::new().stack(&[2, 0, 0]);
        bench.program.set_return_data(Bytes::from_slice(&[1]));
        let err = bench.run(op_returndatacopy).unwrap_err();
        assert_eq!(
            err.exception(),
            Some(ExceptionKind::ReturnDataOutOfBounds {
                offset: 0,
                size: 2,
                available: 1
            })
        );
    }

    #[test]
    fn test_returndatacopy_in_bounds() {
        let mut bench = Bench::new().stack(&[2, 1, 0]);
        bench.program.set_return_data(Bytes::from_slice(&[7, 8, 9]));
        bench.run(op_returndatacopy).unwrap();
        assert_eq!(bench.program.memory().read(0, 2), vec![8, 9]);
    }

    #[test]
    fn test_balance_and_extcodehash() {
        let target = Address::from_low_u64(0x1234);
        let mut bench = Bench::new();
        bench.repo.set_balance(target, U256::from(55));
        let mut bench = bench.stack(&[0x1234]);
        bench.run(op_balance).unwrap();
        assert_eq!(bench.top(), Word::from(55u64));

        let mut bench = bench.stack(&[0x1234]);
        bench.run(op_extcodehash).unwrap();
        let expected = bench.repo.get_code_hash(target).unwrap();
        assert_eq!(bench.top(), Word::from_be_bytes(*expected.as_bytes()));

        let mut bench = bench.stack(&[0x9999]);
        bench.run(op_extcodehash).unwrap();
        assert_eq!(bench.top(), Word::ZERO);
    }
}
