//! # Program (Call Frame)
//!
//! One nested execution context: the immutable invocation environment plus the
//! mutable machine state (pc, gas, stack, memory, return buffers, logs).
//!
//! ## Halt states
//!
//! ```text
//! Running ──STOP/RETURN/SELFDESTRUCT──▶ Stopped
//!    │ ────────────REVERT─────────────▶ Reverted   (output kept, writes discarded)
//!    └────────────exception───────────▶ Excepted   (gas forfeited, writes discarded)
//! ```
//!
//! All three are terminal. State writes go straight to the repository; each
//! frame runs inside its own checkpoint, so a Reverted or Excepted frame is
//! undone by rolling that checkpoint back.

use super::memory::{memory_expansion_cost, Memory};
use super::opcodes::{analyze_jump_destinations, JumpDestinations};
use super::stack::Stack;
use super::word::{Word, WORD_BYTES};
use crate::domain::entities::{BlockContext, CallKind, CallResult, Log};
use crate::domain::fork::GasSchedule;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::{ExceptionKind, VmError};
use crate::ports::outbound::Repository;

// =============================================================================
// INVOCATION ENVIRONMENT
// =============================================================================

/// Read-only inputs of a frame, fixed at construction.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// How the frame was entered.
    pub kind: CallKind,
    /// Account whose storage and balance the code acts on (ADDRESS).
    pub address: Address,
    /// Account the code was loaded from.
    pub code_address: Address,
    /// Immediate caller (CALLER).
    pub caller: Address,
    /// Transaction sender (ORIGIN).
    pub origin: Address,
    /// Apparent value (CALLVALUE).
    pub value: U256,
    /// Input data (calldata; empty for creation frames).
    pub data: Bytes,
    /// Transaction gas price (GASPRICE).
    pub gas_price: U256,
    /// Block environment.
    pub block: BlockContext,
    /// Nesting depth, zero for the top-level frame.
    pub depth: usize,
    /// True under STATICCALL.
    pub is_static: bool,
}

// =============================================================================
// HALT STATE
// =============================================================================

/// Frame lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltState {
    /// Still executing.
    Running,
    /// STOP, RETURN or SELFDESTRUCT.
    Stopped,
    /// REVERT.
    Reverted,
    /// Abnormal halt.
    Excepted(ExceptionKind),
}

impl HaltState {
    /// Returns true for any state other than `Running`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Running
    }
}

// =============================================================================
// PROGRAM
// =============================================================================

/// A call frame.
#[derive(Debug)]
pub struct Program {
    env: Invocation,
    code: Bytes,
    jump_destinations: JumpDestinations,
    pc: usize,
    gas_limit: u64,
    gas_remaining: u64,
    refund: i64,
    stack: Stack,
    memory: Memory,
    /// Output of the most recent child frame (RETURNDATASIZE/RETURNDATACOPY).
    return_data: Bytes,
    /// Data this frame hands back (RETURN/REVERT).
    output: Bytes,
    logs: Vec<Log>,
    destroyed: Vec<Address>,
    halt: HaltState,
}

impl Program {
    /// Creates a frame ready to run `code` with `gas_limit` gas.
    #[must_use]
    pub fn new(env: Invocation, code: Bytes, gas_limit: u64) -> Self {
        let jump_destinations = analyze_jump_destinations(code.as_slice());
        Self {
            env,
            code,
            jump_destinations,
            pc: 0,
            gas_limit,
            gas_remaining: gas_limit,
            refund: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            return_data: Bytes::new(),
            output: Bytes::new(),
            logs: Vec::new(),
            destroyed: Vec::new(),
            halt: HaltState::Running,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Invocation environment.
    #[must_use]
    pub fn env(&self) -> &Invocation {
        &self.env
    }

    /// Code being executed.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        self.code.as_slice()
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Byte at the program counter; `None` past the end of code.
    #[must_use]
    pub fn current_byte(&self) -> Option<u8> {
        self.code.as_slice().get(self.pc).copied()
    }

    /// Gas the frame started with.
    #[must_use]
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Gas not yet spent.
    #[must_use]
    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    /// Net refund counter.
    #[must_use]
    pub fn refund(&self) -> i64 {
        self.refund
    }

    /// Stack.
    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Mutable stack.
    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Memory.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable memory.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Output of the most recent child frame.
    #[must_use]
    pub fn return_data(&self) -> &Bytes {
        &self.return_data
    }

    /// Replaces the child return buffer.
    pub fn set_return_data(&mut self, data: Bytes) {
        self.return_data = data;
    }

    /// Output set by RETURN or REVERT.
    #[must_use]
    pub fn output(&self) -> &Bytes {
        &self.output
    }

    /// Sets the frame output.
    pub fn set_output(&mut self, data: Bytes) {
        self.output = data;
    }

    /// Logs emitted so far.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Current halt state.
    #[must_use]
    pub fn halt_state(&self) -> HaltState {
        self.halt
    }

    /// Returns true while the frame may execute.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.halt == HaltState::Running
    }

    // -------------------------------------------------------------------------
    // Control flow
    // -------------------------------------------------------------------------

    /// Moves the program counter forward by `n` bytes.
    pub fn advance(&mut self, n: usize) {
        self.pc = self.pc.saturating_add(n);
    }

    /// Jumps to `target`.
    ///
    /// # Errors
    ///
    /// `InvalidJump` unless `target` is a JUMPDEST of this code.
    pub fn set_pc(&mut self, target: Word) -> Result<(), ExceptionKind> {
        let destination = target.saturating_usize();
        if !self.jump_destinations.contains(destination) {
            return Err(ExceptionKind::InvalidJump { destination });
        }
        self.pc = destination;
        Ok(())
    }

    /// Enters a terminal state.
    ///
    /// Halting an already halted frame is a bug in the caller.
    pub fn halt(&mut self, state: HaltState) {
        debug_assert!(self.is_running(), "frame halted twice");
        debug_assert!(state.is_terminal(), "halt to Running");
        if self.is_running() {
            self.halt = state;
        }
    }

    // -------------------------------------------------------------------------
    // Gas
    // -------------------------------------------------------------------------

    /// Deducts `amount` gas.
    ///
    /// # Errors
    ///
    /// `OutOfGas` if `amount` exceeds the remaining gas; nothing is deducted.
    pub fn spend_gas(&mut self, amount: u64) -> Result<(), ExceptionKind> {
        if amount > self.gas_remaining {
            return Err(ExceptionKind::OutOfGas);
        }
        self.gas_remaining -= amount;
        Ok(())
    }

    /// Returns unused gas from a finished child frame.
    pub fn refund_gas(&mut self, amount: u64) {
        self.gas_remaining = self.gas_remaining.saturating_add(amount);
    }

    /// Adjusts the refund counter.
    pub fn add_refund(&mut self, delta: i64) {
        self.refund = self.refund.saturating_add(delta);
    }

    /// Charges for and performs the memory growth needed to touch
    /// `[offset, offset + size)`, returning both as `usize`.
    ///
    /// A zero `size` costs nothing and ignores `offset` entirely.
    ///
    /// # Errors
    ///
    /// `OutOfGas` if the span does not fit 64-bit addressing or the expansion
    /// is unaffordable.
    pub fn charge_memory(
        &mut self,
        offset: Word,
        size: Word,
        schedule: &GasSchedule,
    ) -> Result<(usize, usize), ExceptionKind> {
        if size.is_zero() {
            return Ok((0, 0));
        }
        let offset = offset.to_usize()?;
        let size = size.to_usize()?;
        let end = offset.checked_add(size).ok_or(ExceptionKind::OutOfGas)?;

        let old_words = self.memory.words() as u64;
        let new_words = end.div_ceil(WORD_BYTES) as u64;
        let cost = memory_expansion_cost(
            old_words,
            new_words,
            schedule.memory_word,
            schedule.memory_quad_divisor,
        );
        self.spend_gas(cost)?;
        self.memory.extend(offset, size);
        Ok((offset, size))
    }

    // -------------------------------------------------------------------------
    // Storage
    // -------------------------------------------------------------------------

    /// Reads a slot of the executing account.
    ///
    /// # Errors
    ///
    /// Repository failures.
    pub fn storage_load(&self, repo: &dyn Repository, key: Word) -> Result<Word, VmError> {
        Ok(repo.get_storage_value(self.env.address, key)?)
    }

    /// Writes a slot of the executing account.
    ///
    /// # Errors
    ///
    /// `StaticCallStateChange` under STATICCALL, or repository failures.
    pub fn storage_store(
        &self,
        repo: &mut dyn Repository,
        key: Word,
        value: Word,
    ) -> Result<(), VmError> {
        self.require_mutable()?;
        repo.add_storage_row(self.env.address, key, value)?;
        Ok(())
    }

    /// Fails under STATICCALL.
    ///
    /// # Errors
    ///
    /// `StaticCallStateChange` if the frame is static.
    pub fn require_mutable(&self) -> Result<(), ExceptionKind> {
        if self.env.is_static {
            return Err(ExceptionKind::StaticCallStateChange);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Effects merged from children
    // -------------------------------------------------------------------------

    /// Appends a log.
    pub fn push_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    /// Schedules `address` for deletion; false if it already was.
    pub fn record_destroyed(&mut self, address: Address) -> bool {
        if self.destroyed.contains(&address) {
            return false;
        }
        self.destroyed.push(address);
        true
    }

    /// Takes over the effects of a successful child.
    pub fn merge_child(&mut self, child: CallResult) {
        self.logs.extend(child.logs);
        self.add_refund(child.gas_refunded);
        for address in child.destroyed {
            self.record_destroyed(address);
        }
    }

    // -------------------------------------------------------------------------
    // Result
    // -------------------------------------------------------------------------

    /// Consumes the halted frame.
    #[must_use]
    pub fn into_result(self) -> CallResult {
        let gas_used = self.gas_limit - self.gas_remaining;
        match self.halt {
            HaltState::Stopped => CallResult {
                success: true,
                gas_used,
                gas_left: self.gas_remaining,
                gas_refunded: self.refund,
                return_data: self.output,
                logs: self.logs,
                destroyed: self.destroyed,
                ..CallResult::default()
            },
            HaltState::Reverted => CallResult {
                success: false,
                gas_used,
                gas_left: self.gas_remaining,
                return_data: self.output,
                reverted: true,
                ..CallResult::default()
            },
            HaltState::Excepted(kind) => CallResult::failure(self.gas_limit, Some(kind)),
            HaltState::Running => CallResult::failure(
                self.gas_limit,
                Some(ExceptionKind::OutOfGas),
            ),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
