//! # Error Types
//!
//! All error types for bytecode execution.
//!
//! `ExceptionKind` is the closed set of deterministic frame failures. It never
//! escapes the interpreter loop: the failing frame halts `Excepted(kind)` and the
//! parent only observes a 0 on its stack. `VmError` is what the engine returns
//! to its host, and only carries an exception when the outermost caller asked
//! for one explicitly.

use crate::domain::value_objects::Address;
use thiserror::Error;

// =============================================================================
// EXCEPTION KINDS
// =============================================================================

/// Deterministic reasons a frame halts abnormally.
///
/// All of these forfeit the frame's remaining gas and discard its state effects.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Gas exhausted, or an offset/length too large for any gas budget.
    #[error("out of gas")]
    OutOfGas,

    /// Fewer stack items than the opcode consumes.
    #[error("stack too small: required {required}, available {available}")]
    StackTooSmall {
        /// Items the opcode needs.
        required: usize,
        /// Items present.
        available: usize,
    },

    /// Push beyond the 1024-item limit.
    #[error("stack overflow")]
    StackOverflow,

    /// Jump target is not a JUMPDEST in this code.
    #[error("invalid jump destination: {destination}")]
    InvalidJump {
        /// Requested program counter (saturated to usize).
        destination: usize,
    },

    /// Undefined opcode byte for the active fork.
    #[error("illegal operation: 0x{opcode:02X}")]
    IllegalOperation {
        /// The offending byte.
        opcode: u8,
    },

    /// State modification attempted under STATICCALL.
    #[error("state change attempted in static call")]
    StaticCallStateChange,

    /// Deployed code exceeds the fork's size limit.
    #[error("code size exceeded: {size} > {max} bytes")]
    CodeSizeLimit {
        /// Returned code length.
        size: usize,
        /// Active limit.
        max: usize,
    },

    /// CREATE target already holds code or a nonce.
    #[error("contract already exists at address: {0:?}")]
    AddressCollision(Address),

    /// RETURNDATACOPY past the end of the return buffer.
    #[error("return data out of bounds: offset {offset}, size {size}, available {available}")]
    ReturnDataOutOfBounds {
        /// Requested source offset.
        offset: u64,
        /// Requested length.
        size: u64,
        /// Buffer length.
        available: usize,
    },
}

// =============================================================================
// VM ERRORS
// =============================================================================

/// Errors surfaced by the engine to its host.
#[derive(Debug, Error, Clone)]
pub enum VmError {
    /// A frame exception. Handled inside the interpreter loop.
    #[error("exception: {0}")]
    Exception(#[from] ExceptionKind),

    /// The state collaborator failed; execution cannot continue.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Gas limit does not cover the intrinsic transaction cost.
    #[error("intrinsic gas too low: required {required}, limit {limit}")]
    IntrinsicGas {
        /// Intrinsic cost.
        required: u64,
        /// Supplied gas limit.
        limit: u64,
    },

    /// Invalid engine configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in production).
    #[error("internal error: {0}")]
    Internal(String),
}

impl VmError {
    /// Returns the exception kind if this is a frame exception.
    #[must_use]
    pub fn exception(&self) -> Option<ExceptionKind> {
        match self {
            Self::Exception(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns true if the host must abort the whole execution.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Exception(_))
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from the repository collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Account expected but missing.
    #[error("account not found: {0:?}")]
    NotFound(Address),

    /// Debit larger than the balance. The engine checks balances first, so this
    /// indicates a host bug.
    #[error("insufficient balance for {0:?}")]
    InsufficientBalance(Address),

    /// Credit would overflow 256 bits.
    #[error("balance overflow for {0:?}")]
    BalanceOverflow(Address),

    /// `commit`/`rollback` without a matching `start_tracking`.
    #[error("no open checkpoint")]
    NoCheckpoint,

    /// Other state error.
    #[error("state error: {0}")]
    Other(String),
}

// =============================================================================
// PRECOMPILE ERRORS
// =============================================================================

/// Errors from precompiled contract execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Forwarded gas does not cover the precompile's price.
    #[error("precompile out of gas")]
    OutOfGas,

    /// Malformed input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// =============================================================================
// TESTS
// =============================================================================
