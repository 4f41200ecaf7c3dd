//! # EVM Interpreter
//!
//! The fetch/charge/execute loop, run over an explicit stack of frames.
//!
//! ## Step
//!
//! 1. Check the interrupt flag (an interrupted frame halts as out of gas).
//! 2. Fetch the byte at `pc`; past the end of code is STOP.
//! 3. Look it up in the fork's [`OpcodeTable`]; a miss is an illegal
//!    operation.
//! 4. Check stack arity, charge the base cost, run the handler.
//! 5. Advance `pc` unless the handler jumped or halted.
//!
//! CALL and CREATE do not recurse on the Rust stack: the handler returns a
//! request, the call manager prepares a child frame and the loop continues on
//! it. When a frame halts it is completed and absorbed into its parent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::call_manager::{
    absorb, complete, prepare_call, prepare_create, Frame, Prepared, ReturnTarget, TxContext,
};
use super::host::{Control, Host};
use super::program::{HaltState, Program};
use super::table::OpcodeTable;
use crate::domain::entities::CallResult;
use crate::domain::value_objects::Address;
use crate::errors::{ExceptionKind, VmError};

// =============================================================================
// INTERRUPT
// =============================================================================

/// Shared flag that stops a running execution at the next opcode boundary.
#[derive(Clone, Debug, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// Creates a cleared handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests interruption.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clears a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Returns true once interruption was requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =============================================================================
// INTERPRETER
// =============================================================================

/// Runs one frame tree to completion.
pub struct Interpreter<'h> {
    host: Host<'h>,
    table: &'h OpcodeTable,
    interrupt: Option<InterruptHandle>,
}

impl<'h> Interpreter<'h> {
    /// Creates an interpreter over `host` dispatching through `table`.
    #[must_use]
    pub fn new(host: Host<'h>, table: &'h OpcodeTable) -> Self {
        Self {
            host,
            table,
            interrupt: None,
        }
    }

    /// Polls `handle` before every opcode.
    #[must_use]
    pub fn with_interrupt(mut self, handle: InterruptHandle) -> Self {
        self.interrupt = Some(handle);
        self
    }

    /// Runs `root` and every frame it spawns. The root's checkpoint must
    /// already be open; it is committed or rolled back like any other frame.
    ///
    /// # Errors
    ///
    /// Fatal errors only (repository failures). Every checkpoint still open is
    /// rolled back before returning.
    pub fn run(&mut self, root: Frame) -> Result<CallResult, VmError> {
        let mut frames = vec![root];
        match self.drive(&mut frames) {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!(%err, open_frames = frames.len(), "fatal error, unwinding frames");
                for _ in 0..frames.len() {
                    if let Err(rollback) = self.host.repo.rollback() {
                        warn!(%rollback, "rollback failed while unwinding");
                    }
                }
                Err(err)
            }
        }
    }

    fn drive(&mut self, frames: &mut Vec<Frame>) -> Result<CallResult, VmError> {
        loop {
            let Some(frame) = frames.last_mut() else {
                return Err(VmError::Internal("frame stack underflow".to_string()));
            };

            if frame.program.is_running() {
                let control = self.step(&mut frame.program)?;
                let depth = frame.program.env().depth + 1;
                match control {
                    Control::Call(request) => {
                        let tx = TxContext::of(frame.program.env());
                        let target = ReturnTarget::Call {
                            out_offset: request.out_offset,
                            out_len: request.out_len,
                        };
                        debug!(depth, kind = ?request.kind, to = ?request.code_address, gas = request.gas, "call");
                        match prepare_call(&mut self.host, &tx, depth, *request)? {
                            Prepared::Finished(result) => {
                                absorb(&mut frame.program, result, target)?;
                            }
                            Prepared::Enter(program) => frames.push(Frame { program, target }),
                        }
                    }
                    Control::Create(request) => {
                        let tx = TxContext::of(frame.program.env());
                        debug!(depth, kind = ?request.kind, gas = request.gas, "create");
                        let (prepared, address) =
                            prepare_create(&mut self.host, &tx, depth, *request)?;
                        let target = ReturnTarget::Create {
                            address: address.unwrap_or(Address::ZERO),
                        };
                        match prepared {
                            Prepared::Finished(result) => {
                                absorb(&mut frame.program, result, target)?;
                            }
                            Prepared::Enter(program) => frames.push(Frame { program, target }),
                        }
                    }
                    Control::Continue | Control::Jump | Control::Halt => {}
                }
                continue;
            }

            let Some(finished) = frames.pop() else {
                return Err(VmError::Internal("frame stack underflow".to_string()));
            };
            let target = finished.target;
            let result = complete(&mut self.host, finished)?;
            match frames.last_mut() {
                Some(parent) => absorb(&mut parent.program, result, target)?,
                None => return Ok(result),
            }
        }
    }

    /// Executes one instruction of `program`.
    fn step(&mut self, program: &mut Program) -> Result<Control, VmError> {
        if self
            .interrupt
            .as_ref()
            .is_some_and(InterruptHandle::is_interrupted)
        {
            debug!(pc = program.pc(), "execution interrupted");
            program.halt(HaltState::Excepted(ExceptionKind::OutOfGas));
            return Ok(Control::Halt);
        }

        let Some(byte) = program.current_byte() else {
            program.halt(HaltState::Stopped);
            return Ok(Control::Halt);
        };
        let Some(&info) = self.table.get(byte) else {
            program.halt(HaltState::Excepted(ExceptionKind::IllegalOperation {
                opcode: byte,
            }));
            return Ok(Control::Halt);
        };

        trace!(
            pc = program.pc(),
            opcode = %info.opcode,
            gas = program.gas_remaining(),
            stack = program.stack().len(),
            depth = program.env().depth,
        );

        let outcome = program
            .stack()
            .require(info.stack_in, info.stack_out)
            .and_then(|()| program.spend_gas(info.base_gas))
            .map_err(VmError::from)
            .and_then(|()| (info.handler)(program, &mut self.host));

        match outcome {
            Ok(control) => {
                if matches!(
                    control,
                    Control::Continue | Control::Call(_) | Control::Create(_)
                ) {
                    program.advance(1);
                }
                Ok(control)
            }
            Err(VmError::Exception(kind)) => {
                debug!(pc = program.pc(), opcode = %info.opcode, %kind, "frame exception");
                program.halt(HaltState::Excepted(kind));
                Ok(Control::Halt)
            }
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::block_hash_adapter::InMemoryBlockHashes;
    use crate::adapters::state_adapter::InMemoryRepository;
    use crate::domain::fork::ForkRules;
    use crate::domain::value_objects::{Bytes, U256};
    use crate::evm::precompiles::PrecompileRegistry;
    use crate::evm::program::tests::invocation;
    use crate::evm::word::Word;
    use crate::ports::outbound::Repository;

    struct Run {
        result: CallResult,
        repo: InMemoryRepository,
    }

    fn run_with(
        mut repo: InMemoryRepository,
        code: &[u8],
        gas: u64,
        interrupt: Option<InterruptHandle>,
    ) -> Run {
        let rules = ForkRules::default();
        let table = OpcodeTable::for_rules(&rules);
        let precompiles = PrecompileRegistry::for_rules(&rules);
        let hashes = InMemoryBlockHashes::new();
        let env = invocation();
        repo.set_code(env.address, Bytes::from_slice(code));

        repo.start_tracking();
        let result = {
            let host = Host {
                repo: &mut repo,
                rules: &rules,
                block_hashes: &hashes,
                precompiles: &precompiles,
            };
            let mut interpreter = Interpreter::new(host, &table);
            if let Some(handle) = interrupt {
                interpreter = interpreter.with_interrupt(handle);
            }
            let program = Program::new(env, Bytes::from_slice(code), gas);
            interpreter
                .run(Frame {
                    program,
                    target: ReturnTarget::Call {
                        out_offset: 0,
                        out_len: 0,
                    },
                })
                .unwrap()
        };
        Run { result, repo }
    }

    fn run(code: &[u8], gas: u64) -> Run {
        run_with(InMemoryRepository::new(), code, gas, None)
    }

    #[test]
    fn test_add_and_return() {
        // PUSH1 2 PUSH1 3 ADD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let code = [
            0x60, 0x02, 0x60, 0x03, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3,
        ];
        let run = run(&code, 100_000);
        assert!(run.result.success);
        assert_eq!(
            Word::from_be_slice(run.result.return_data.as_slice()),
            Word::from(5u64)
        );
        assert_eq!(run.result.gas_used, 24);
    }

    #[test]
    fn test_calldatasize_costs_base_only() {
        let run = run(&[0x36, 0x00], 100);
        assert!(run.result.success);
        assert_eq!(run.result.gas_used, 2);
        assert_eq!(run.result.gas_left, 98);
    }

    #[test]
    fn test_running_off_the_end_stops() {
        let run = run(&[0x60, 0x01], 100);
        assert!(run.result.success);
        assert_eq!(run.result.gas_used, 3);
    }

    #[test]
    fn test_illegal_opcode_consumes_all_gas() {
        let run = run(&[0xFE], 5_000);
        assert!(!run.result.success);
        assert_eq!(
            run.result.exception,
            Some(ExceptionKind::IllegalOperation { opcode: 0xFE })
        );
        assert_eq!(run.result.gas_used, 5_000);
    }

    #[test]
    fn test_stack_underflow() {
        let run = run(&[0x01], 100);
        assert_eq!(
            run.result.exception,
            Some(ExceptionKind::StackTooSmall {
                required: 2,
                available: 0
            })
        );
    }

    #[test]
    fn test_infinite_loop_runs_out_of_gas() {
        // JUMPDEST PUSH1 0 JUMP
        let run = run(&[0x5B, 0x60, 0x00, 0x56], 1_000);
        assert_eq!(run.result.exception, Some(ExceptionKind::OutOfGas));
        assert_eq!(run.result.gas_left, 0);
    }

    #[test]
    fn test_interrupt_halts_like_out_of_gas() {
        let handle = InterruptHandle::new();
        handle.interrupt();
        // PUSH1 1 PUSH1 0 SSTORE
        let code = [0x60, 0x01, 0x60, 0x00, 0x55];
        let run = run_with(InMemoryRepository::new(), &code, 100_000, Some(handle));
        assert_eq!(run.result.exception, Some(ExceptionKind::OutOfGas));
        assert!(run.repo.storage_of(invocation().address).is_empty());
    }

    #[test]
    fn test_revert_discards_storage_and_keeps_gas() {
        // PUSH1 1 PUSH1 0 SSTORE PUSH1 0 PUSH1 0 REVERT
        let code = [0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0xFD];
        let run = run(&code, 100_000);
        assert!(run.result.reverted);
        assert!(run.result.gas_left > 0);
        assert!(run.repo.storage_of(invocation().address).is_empty());
        assert_eq!(run.repo.checkpoint_depth(), 0);
    }

    #[test]
    fn test_nested_call_returns_child_output() {
        let callee = Address::from_low_u64(0xBB);
        // callee: PUSH1 0x2A PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let callee_code = [
            0x60, 0x2A, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3,
        ];
        let mut repo = InMemoryRepository::new();
        repo.set_code(callee, Bytes::from_slice(&callee_code));

        // caller: CALL(gas=0xFFFF, 0xBB, 0, 0, 0, out=0, 32), then return
        // memory[0..32] and the flag stored at 32.
        let code = [
            0x60, 0x20, // out size
            0x60, 0x00, // out offset
            0x60, 0x00, // in size
            0x60, 0x00, // in offset
            0x60, 0x00, // value
            0x60, 0xBB, // target
            0x61, 0xFF, 0xFF, // gas
            0xF1, // CALL
            0x60, 0x20, 0x52, // MSTORE flag at 32
            0x60, 0x40, 0x60, 0x00, 0xF3, // RETURN memory[0..64]
        ];
        let run = run_with(repo, &code, 200_000, None);
        assert!(run.result.success);
        let output = run.result.return_data.as_slice();
        assert_eq!(Word::from_be_slice(&output[..32]), Word::from(0x2Au64));
        assert_eq!(Word::from_be_slice(&output[32..]), Word::ONE);
    }

    #[test]
    fn test_child_out_of_gas_pushes_zero() {
        let callee = Address::from_low_u64(0xBB);
        // callee: PUSH1 1 PUSH1 0 SSTORE (needs 20_000+)
        let mut repo = InMemoryRepository::new();
        repo.set_code(callee, Bytes::from_slice(&[0x60, 0x01, 0x60, 0x00, 0x55]));
        repo.set_balance(callee, U256::one());

        // CALL with 5000 gas, store flag at slot 0 of the caller.
        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // sizes, value
            0x60, 0xBB, // target
            0x61, 0x13, 0x88, // gas 5000
            0xF1, // CALL
            0x60, 0x00, 0x55, // SSTORE flag at 0
            0x00,
        ];
        let run = run_with(repo, &code, 200_000, None);
        assert!(run.result.success);
        assert!(run.repo.storage_of(callee).is_empty());
        assert_eq!(
            run.repo
                .get_storage_value(invocation().address, Word::ZERO)
                .unwrap(),
            Word::ZERO
        );
    }
}
