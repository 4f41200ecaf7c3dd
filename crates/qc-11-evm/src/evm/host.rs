//! # Host
//!
//! What an instruction handler sees besides its own frame, and what it hands
//! back to the interpreter loop.

use super::precompiles::PrecompileRegistry;
use super::program::Program;
use super::word::Word;
use crate::domain::entities::CallKind;
use crate::domain::fork::ForkRules;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::VmError;
use crate::ports::outbound::{BlockHashes, Repository};

/// Collaborators shared by every frame of one execution.
pub struct Host<'a> {
    /// Account and storage state.
    pub repo: &'a mut dyn Repository,
    /// Active protocol rules.
    pub rules: &'a ForkRules,
    /// BLOCKHASH oracle.
    pub block_hashes: &'a dyn BlockHashes,
    /// Precompiles active under `rules`.
    pub precompiles: &'a PrecompileRegistry,
}

/// Instruction handler.
pub type Handler = fn(&mut Program, &mut Host<'_>) -> Result<Control, VmError>;

/// What the interpreter does after a handler returns.
#[derive(Debug)]
pub enum Control {
    /// Advance past the opcode.
    Continue,
    /// The handler set the program counter.
    Jump,
    /// The handler halted the frame.
    Halt,
    /// Suspend this frame and run a message call.
    Call(Box<CallRequest>),
    /// Suspend this frame and run a contract creation.
    Create(Box<CreateRequest>),
}

/// Message call requested by CALL, CALLCODE, DELEGATECALL or STATICCALL.
#[derive(Clone, Debug)]
pub struct CallRequest {
    /// Opcode that issued the call.
    pub kind: CallKind,
    /// Gas handed to the child, stipend included. Already deducted from the
    /// parent.
    pub gas: u64,
    /// CALLER inside the child.
    pub caller: Address,
    /// Account the child acts on.
    pub address: Address,
    /// Account whose code runs.
    pub code_address: Address,
    /// CALLVALUE inside the child.
    pub value: U256,
    /// Whether `value` moves from `caller` to `address`.
    pub transfers_value: bool,
    /// Calldata.
    pub input: Bytes,
    /// Parent memory span receiving the output.
    pub out_offset: usize,
    /// Length of that span.
    pub out_len: usize,
    /// Child runs static.
    pub is_static: bool,
}

/// Contract creation requested by CREATE or CREATE2.
#[derive(Clone, Debug)]
pub struct CreateRequest {
    /// `Create` or `Create2`.
    pub kind: CallKind,
    /// Gas handed to the init code. Already deducted from the parent.
    pub gas: u64,
    /// Creating account.
    pub creator: Address,
    /// Endowment.
    pub value: U256,
    /// Init code.
    pub init_code: Bytes,
    /// CREATE2 salt.
    pub salt: Option<Word>,
}
