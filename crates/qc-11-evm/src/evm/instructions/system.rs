//! System operations: halting, creation, message calls and SELFDESTRUCT.
//!
//! CALL-family and CREATE handlers only price the request and take the child's
//! gas out of the frame; the call manager runs the child.

use crate::domain::entities::CallKind;
use crate::domain::value_objects::Bytes;
use crate::errors::VmError;
use crate::evm::gas::{all_but_one_64th, forwarded_gas, sha3_word_cost};
use crate::evm::host::{CallRequest, Control, CreateRequest, Host};
use crate::evm::program::{HaltState, Program};
use crate::evm::word::Word;

// =============================================================================
// HALTING
// =============================================================================

/// STOP
pub fn op_stop(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    program.halt(HaltState::Stopped);
    Ok(Control::Halt)
}

/// RETURN
pub fn op_return(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let output = read_output(program, host)?;
    program.set_output(output);
    program.halt(HaltState::Stopped);
    Ok(Control::Halt)
}

/// REVERT: halts keeping the output, discarding state changes.
pub fn op_revert(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let output = read_output(program, host)?;
    program.set_output(output);
    program.halt(HaltState::Reverted);
    Ok(Control::Halt)
}

fn read_output(program: &mut Program, host: &Host<'_>) -> Result<Bytes, VmError> {
    let [offset, size] = program.stack_mut().pop_n::<2>()?;
    let (offset, size) = program.charge_memory(offset, size, &host.rules.gas)?;
    Ok(Bytes::from_vec(program.memory().read(offset, size)))
}

/// SELFDESTRUCT: moves the whole balance to the beneficiary and schedules the
/// account for deletion at the end of the transaction.
pub fn op_selfdestruct(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    program.require_mutable()?;
    let beneficiary = program.stack_mut().pop()?.to_address();
    let address = program.env().address;
    let balance = host.repo.get_balance(address)?;

    let gas = &host.rules.gas;
    if gas.selfdestruct_new_account > 0 {
        let new_account = if host.rules.empty_account_semantics {
            !balance.is_zero() && host.repo.is_empty(beneficiary)?
        } else {
            !host.repo.is_exist(beneficiary)?
        };
        if new_account {
            program.spend_gas(gas.selfdestruct_new_account)?;
        }
    }

    program.record_destroyed(address);
    if beneficiary != address && !balance.is_zero() {
        host.repo.sub_balance(address, balance)?;
        host.repo.add_balance(beneficiary, balance)?;
    }
    program.halt(HaltState::Stopped);
    Ok(Control::Halt)
}

// =============================================================================
// CREATION
// =============================================================================

/// CREATE
pub fn op_create(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    create(program, host, CallKind::Create)
}

/// CREATE2
pub fn op_create2(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    create(program, host, CallKind::Create2)
}

fn create(program: &mut Program, host: &Host<'_>, kind: CallKind) -> Result<Control, VmError> {
    program.require_mutable()?;
    let [value, offset, size] = program.stack_mut().pop_n::<3>()?;
    let salt = if kind == CallKind::Create2 {
        Some(program.stack_mut().pop()?)
    } else {
        None
    };

    let (offset, size) = program.charge_memory(offset, size, &host.rules.gas)?;
    if salt.is_some() {
        program.spend_gas(sha3_word_cost(&host.rules.gas, size))?;
    }
    let init_code = Bytes::from_vec(program.memory().read(offset, size));

    let remaining = program.gas_remaining();
    let gas = if host.rules.limit_call_gas {
        all_but_one_64th(remaining, host.rules.gas.call_gas_divisor)
    } else {
        remaining
    };
    program.spend_gas(gas)?;

    Ok(Control::Create(Box::new(CreateRequest {
        kind,
        gas,
        creator: program.env().address,
        value: value.0,
        init_code,
        salt,
    })))
}

// =============================================================================
// MESSAGE CALLS
// =============================================================================

/// CALL
pub fn op_call(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    call(program, host, CallKind::Call)
}

/// CALLCODE
pub fn op_callcode(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    call(program, host, CallKind::CallCode)
}

/// DELEGATECALL
pub fn op_delegatecall(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    call(program, host, CallKind::DelegateCall)
}

/// STATICCALL
pub fn op_staticcall(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    call(program, host, CallKind::StaticCall)
}

fn call(program: &mut Program, host: &mut Host<'_>, kind: CallKind) -> Result<Control, VmError> {
    let has_value_operand = matches!(kind, CallKind::Call | CallKind::CallCode);

    let [gas_word, target] = program.stack_mut().pop_n::<2>()?;
    let target = target.to_address();
    let value = if has_value_operand {
        program.stack_mut().pop()?
    } else {
        Word::ZERO
    };
    let [in_offset, in_size, out_offset, out_size] = program.stack_mut().pop_n::<4>()?;

    let transfers_value = has_value_operand && !value.is_zero();
    if kind == CallKind::Call && transfers_value {
        program.require_mutable()?;
    }

    let rules = host.rules;
    let schedule = &rules.gas;
    let (in_offset, in_size) = program.charge_memory(in_offset, in_size, schedule)?;
    let (out_offset, out_size) = program.charge_memory(out_offset, out_size, schedule)?;

    let mut extra = 0u64;
    if transfers_value {
        extra += schedule.call_value;
    }
    if kind == CallKind::Call {
        let new_account = if rules.empty_account_semantics {
            transfers_value && host.repo.is_empty(target)?
        } else {
            !host.repo.is_exist(target)?
        };
        if new_account {
            extra += schedule.call_new_account;
        }
    }
    program.spend_gas(extra)?;

    let forwarded = forwarded_gas(rules, program.gas_remaining(), gas_word)?;
    program.spend_gas(forwarded)?;
    let gas = if transfers_value {
        forwarded.saturating_add(schedule.call_stipend)
    } else {
        forwarded
    };

    let env = program.env();
    let (caller, address, value) = match kind {
        CallKind::CallCode => (env.address, env.address, value.0),
        CallKind::DelegateCall => (env.caller, env.address, env.value),
        _ => (env.address, target, value.0),
    };
    let is_static = env.is_static || kind == CallKind::StaticCall;
    let input = Bytes::from_vec(program.memory().read(in_offset, in_size));

    Ok(Control::Call(Box::new(CallRequest {
        kind,
        gas,
        caller,
        address,
        code_address: target,
        value,
        transfers_value,
        input,
        out_offset,
        out_len: out_size,
        is_static,
    })))
}
