//! # Call Manager
//!
//! Frame entry and exit for message calls and contract creation.
//!
//! ## Checkpoints
//!
//! Every child frame runs inside its own repository checkpoint:
//!
//! ```text
//! prepare_*  ── start_tracking ──▶ child runs ──▶ complete ── commit   (Stopped)
//!                                                          └─ rollback (Reverted / Excepted)
//! ```
//!
//! Calls that never enter a frame (precompiles, empty code) open and close
//! their checkpoint inside `prepare_call`. Depth and balance failures open
//! none at all. A fatal repository error while a frame is being set up or
//! finalized rolls that frame's checkpoint back before it propagates.

use tracing::{debug, warn};

use super::gas::code_deposit_cost;
use super::host::{CallRequest, CreateRequest, Host};
use super::program::{Invocation, Program};
use super::word::Word;
use crate::domain::entities::{BlockContext, CallResult};
use crate::domain::services::{compute_contract_address, compute_contract_address_create2};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::{ExceptionKind, VmError};

// =============================================================================
// TYPES
// =============================================================================

/// Transaction-wide inputs every frame inherits.
#[derive(Clone, Debug)]
pub struct TxContext {
    /// ORIGIN.
    pub origin: Address,
    /// GASPRICE.
    pub gas_price: U256,
    /// Block environment.
    pub block: BlockContext,
}

impl TxContext {
    /// Context of the transaction `env` belongs to.
    #[must_use]
    pub fn of(env: &Invocation) -> Self {
        Self {
            origin: env.origin,
            gas_price: env.gas_price,
            block: env.block.clone(),
        }
    }
}

/// Where a finished frame's result goes in its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnTarget {
    /// CALL family: output copied to this span of parent memory.
    Call {
        /// Memory offset.
        out_offset: usize,
        /// Span length.
        out_len: usize,
    },
    /// CREATE family: the new contract's address.
    Create {
        /// Address being created.
        address: Address,
    },
}

/// A suspended or running frame.
#[derive(Debug)]
pub struct Frame {
    /// Machine state.
    pub program: Program,
    /// Destination of the result.
    pub target: ReturnTarget,
}

/// Outcome of preparing a call or creation.
#[derive(Debug)]
pub enum Prepared {
    /// Resolved without running bytecode.
    Finished(CallResult),
    /// A child frame to run; its checkpoint is open.
    Enter(Program),
}

// =============================================================================
// MESSAGE CALLS
// =============================================================================

/// Checks and sets up a message call for a frame at `depth`.
///
/// # Errors
///
/// Only fatal repository failures; every EVM-level failure is reported as a
/// `Finished` result.
pub fn prepare_call(
    host: &mut Host<'_>,
    tx: &TxContext,
    depth: usize,
    request: CallRequest,
) -> Result<Prepared, VmError> {
    if depth > host.rules.max_call_depth {
        debug!(depth, "call depth exceeded");
        return Ok(Prepared::Finished(CallResult::failure(request.gas, None)));
    }
    if request.transfers_value && host.repo.get_balance(request.caller)? < request.value {
        debug!(caller = ?request.caller, "insufficient balance for call value");
        return Ok(Prepared::Finished(CallResult::failure(request.gas, None)));
    }

    let code = within_checkpoint(host, |host| {
        if request.transfers_value {
            host.repo.sub_balance(request.caller, request.value)?;
            host.repo.add_balance(request.address, request.value)?;
        }
        Ok(host.repo.get_code(request.code_address)?)
    })?;

    if let Some(precompile) = host.precompiles.get(request.code_address) {
        let result = match precompile.execute(request.input.as_slice(), request.gas) {
            Ok(output) => {
                host.repo.commit()?;
                CallResult::success(request.gas, output.gas_used, output.output)
            }
            Err(err) => {
                debug!(address = ?request.code_address, %err, "precompile failed");
                host.repo.rollback()?;
                CallResult::failure(request.gas, Some(ExceptionKind::OutOfGas))
            }
        };
        return Ok(Prepared::Finished(result));
    }

    if code.is_empty() {
        host.repo.commit()?;
        return Ok(Prepared::Finished(CallResult::success(
            request.gas,
            0,
            Bytes::new(),
        )));
    }

    let env = Invocation {
        kind: request.kind,
        address: request.address,
        code_address: request.code_address,
        caller: request.caller,
        origin: tx.origin,
        value: request.value,
        data: request.input,
        gas_price: tx.gas_price,
        block: tx.block.clone(),
        depth,
        is_static: request.is_static,
    };
    Ok(Prepared::Enter(Program::new(env, code, request.gas)))
}

/// Opens a frame checkpoint and runs `setup` inside it. The checkpoint is
/// rolled back if `setup` fails, so the caller only ever owns it on `Ok`.
fn within_checkpoint<T>(
    host: &mut Host<'_>,
    setup: impl FnOnce(&mut Host<'_>) -> Result<T, VmError>,
) -> Result<T, VmError> {
    host.repo.start_tracking();
    match setup(host) {
        Ok(value) => Ok(value),
        Err(err) => {
            discard_checkpoint(host);
            Err(err)
        }
    }
}

/// Rolls back the innermost checkpoint on a fatal path; the original error
/// wins over a rollback failure.
fn discard_checkpoint(host: &mut Host<'_>) {
    if let Err(rollback) = host.repo.rollback() {
        warn!(%rollback, "rollback failed after fatal error");
    }
}

// =============================================================================
// CONTRACT CREATION
// =============================================================================

/// Checks a CREATE/CREATE2 request, bumps the creator's nonce and derives the
/// new address, then sets up the init frame. Returns the address alongside.
///
/// # Errors
///
/// Only fatal repository failures.
pub fn prepare_create(
    host: &mut Host<'_>,
    tx: &TxContext,
    depth: usize,
    request: CreateRequest,
) -> Result<(Prepared, Option<Address>), VmError> {
    if depth > host.rules.max_call_depth {
        debug!(depth, "create depth exceeded");
        return Ok((Prepared::Finished(CallResult::failure(request.gas, None)), None));
    }
    if host.repo.get_balance(request.creator)? < request.value {
        debug!(creator = ?request.creator, "insufficient balance for endowment");
        return Ok((Prepared::Finished(CallResult::failure(request.gas, None)), None));
    }

    let nonce = host.repo.increase_nonce(request.creator)?;
    let address = match request.salt {
        Some(salt) => compute_contract_address_create2(
            request.creator,
            &salt.to_be_bytes(),
            request.init_code.as_slice(),
        ),
        None => compute_contract_address(request.creator, nonce),
    };

    let prepared = enter_create(host, tx, depth, request, address)?;
    Ok((prepared, Some(address)))
}

/// Sets up the init frame of a creation at an already derived `address`.
///
/// # Errors
///
/// Only fatal repository failures.
pub fn enter_create(
    host: &mut Host<'_>,
    tx: &TxContext,
    depth: usize,
    request: CreateRequest,
    address: Address,
) -> Result<Prepared, VmError> {
    if host.repo.get_nonce(address)? != 0 || !host.repo.get_code(address)?.is_empty() {
        debug!(?address, "contract address collision");
        return Ok(Prepared::Finished(CallResult::failure(
            request.gas,
            Some(ExceptionKind::AddressCollision(address)),
        )));
    }

    within_checkpoint(host, |host| {
        host.repo.create_account(address)?;
        for _ in 0..host.rules.create_nonce {
            host.repo.increase_nonce(address)?;
        }
        if !request.value.is_zero() {
            host.repo.sub_balance(request.creator, request.value)?;
            host.repo.add_balance(address, request.value)?;
        }
        Ok(())
    })?;

    let env = Invocation {
        kind: request.kind,
        address,
        code_address: address,
        caller: request.creator,
        origin: tx.origin,
        value: request.value,
        data: Bytes::new(),
        gas_price: tx.gas_price,
        block: tx.block.clone(),
        depth,
        is_static: false,
    };
    Ok(Prepared::Enter(Program::new(env, request.init_code, request.gas)))
}

// =============================================================================
// FRAME EXIT
// =============================================================================

/// Finalizes a halted frame: deposits code for a successful creation, then
/// commits or rolls back the frame's checkpoint.
///
/// # Errors
///
/// Only fatal repository failures.
pub fn complete(host: &mut Host<'_>, frame: Frame) -> Result<CallResult, VmError> {
    let Frame { program, target } = frame;
    let depth = program.env().depth;
    let mut result = program.into_result();

    if let ReturnTarget::Create { address } = target {
        if result.success {
            result = match deposit_code(host, result, address) {
                Ok(result) => result,
                Err(err) => {
                    discard_checkpoint(host);
                    return Err(err);
                }
            };
        }
    }

    if result.success {
        host.repo.commit()?;
    } else {
        host.repo.rollback()?;
    }
    debug!(
        depth,
        success = result.success,
        reverted = result.reverted,
        gas_used = result.gas_used,
        "frame finished"
    );
    Ok(result)
}

fn deposit_code(
    host: &mut Host<'_>,
    mut result: CallResult,
    address: Address,
) -> Result<CallResult, VmError> {
    let gas_limit = result.gas_used + result.gas_left;
    let code = std::mem::take(&mut result.return_data);

    if let Some(max) = host.rules.max_code_size {
        if code.len() > max {
            return Ok(CallResult::failure(
                gas_limit,
                Some(ExceptionKind::CodeSizeLimit {
                    size: code.len(),
                    max,
                }),
            ));
        }
    }

    let deposit = code_deposit_cost(&host.rules.gas, code.len());
    if deposit > result.gas_left {
        if host.rules.fail_create_on_deposit_oog {
            return Ok(CallResult::failure(gas_limit, Some(ExceptionKind::OutOfGas)));
        }
        // Frontier keeps the account, without code.
        result.new_address = Some(address);
        return Ok(result);
    }

    result.gas_left -= deposit;
    result.gas_used += deposit;
    host.repo.save_code(address, code)?;
    result.new_address = Some(address);
    Ok(result)
}

/// Hands a child's result back to its parent: unused gas, output, the
/// success flag on the stack and, on success, the child's logs, refunds and
/// self-destructs.
///
/// # Errors
///
/// Stack overflow cannot happen after the table's arity check; errors are
/// propagated regardless.
pub fn absorb(
    parent: &mut Program,
    result: CallResult,
    target: ReturnTarget,
) -> Result<(), VmError> {
    parent.refund_gas(result.gas_left);

    let flag = match target {
        ReturnTarget::Call {
            out_offset,
            out_len,
        } => {
            parent.memory_mut().extend_and_write(
                out_offset,
                result.return_data.as_slice(),
                out_len,
                true,
            );
            parent.set_return_data(result.return_data.clone());
            Word::from(result.success)
        }
        ReturnTarget::Create { .. } => {
            if result.success {
                parent.set_return_data(Bytes::new());
            } else {
                parent.set_return_data(result.return_data.clone());
            }
            match result.new_address {
                Some(address) if result.success => Word::from(address),
                _ => Word::ZERO,
            }
        }
    };
    parent.stack_mut().push(flag)?;

    if result.success {
        parent.merge_child(result);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
