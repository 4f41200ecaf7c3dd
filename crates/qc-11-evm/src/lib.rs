//! # QC-11 EVM - Bytecode Execution Engine
//!
//! **Subsystem ID:** 11
//! **Status:** Frontier through Istanbul
//!
//! ## Purpose
//!
//! Executes EVM bytecode deterministically: 256-bit words, a bounded stack,
//! word-aligned memory, fork-parameterized gas metering, nested CALL/CREATE
//! frames with checkpointed state and the precompiled contracts 0x01..0x05.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Gas never goes negative | `evm/program.rs` - `Program::spend_gas()` |
//! | Halted frames never mutate | `evm/program.rs` - `Program::halt()` |
//! | Failed frames leave no state behind | `evm/call_manager.rs` - `complete()` |
//! | Static frames never write | `evm/program.rs` - `Program::require_mutable()` |
//! | Call depth bounded | `evm/call_manager.rs` - `prepare_call()`, `prepare_create()` |
//!
//! ## Execution Safety Limits
//!
//! | Limit | Value | Purpose |
//! |-------|-------|---------|
//! | `max_call_depth` | 1024 | Bound nested frames |
//! | `max_code_size` | 24 KB (EIP-170) | Limit contract size |
//! | `max_stack_size` | 1024 | EVM stack limit |
//!
//! Frames live on an explicit stack inside the interpreter, so nesting never
//! grows the native call stack.
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | State | `Repository` | Accounts, storage, checkpoints |
//! | Chain | `BlockHashes` | BLOCKHASH lookups |
//! | Crypto | `SignatureVerifier` | ecrecover precompile |
//!
//! ## EVM Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Interpreter | `evm/interpreter.rs` | Fetch/charge/execute loop |
//! | Opcode table | `evm/table.rs` | Per-fork dispatch data |
//! | Call manager | `evm/call_manager.rs` | Frame entry and exit |
//! | Program | `evm/program.rs` | One frame's state |
//! | Gas | `evm/gas.rs` | Dynamic cost formulas |
//! | Precompiles | `evm/precompiles/` | ecrecover, sha256, ripemd160, identity, modexp |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_evm::prelude::*;
//!
//! let evm = Evm::new(&EvmConfig::from_env()?)?;
//! let result = evm.transact(&mut repo, &BlockContext::default(), &message)?;
//!
//! if result.success {
//!     println!("Gas used: {}", result.gas_used);
//!     println!("Output: {:?}", result.return_data);
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod evm;
pub mod ports;
pub mod service;
pub mod telemetry;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{BlockContext, CallKind, CallResult, Log, Message};

    // Fork rules
    pub use crate::domain::fork::{Fork, ForkRules, GasSchedule, SstoreMetering};

    // Value objects
    pub use crate::domain::value_objects::{Address, Bytes, EcdsaSignature, Hash, U256};

    // Domain services
    pub use crate::domain::services::{
        compute_contract_address, compute_contract_address_create2, intrinsic_gas, keccak256,
    };

    // Ports
    pub use crate::ports::inbound::ExecutionApi;
    pub use crate::ports::outbound::{BlockHashes, Repository, SignatureVerifier};

    // Errors
    pub use crate::errors::{ExceptionKind, PrecompileError, StateError, VmError};

    // EVM components
    pub use crate::evm::{
        gas, InterruptHandle, Memory, Opcode, OpcodeTable, PrecompileRegistry, Stack, Word,
    };

    // Adapters
    pub use crate::adapters::{InMemoryBlockHashes, InMemoryRepository, K256Verifier};

    // Configuration and service
    pub use crate::config::EvmConfig;
    pub use crate::service::Evm;
    pub use crate::telemetry::init_tracing;
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "EVM";

// =============================================================================
// TESTS
// =============================================================================
