//! # EVM Implementation
//!
//! The bytecode machine: words, stack, memory, gas arithmetic, the opcode
//! table, instruction handlers, precompiles and the frame-stack interpreter.
//!
//! ## Components
//!
//! - `word.rs` - 256-bit machine word
//! - `stack.rs` / `memory.rs` - per-frame data areas
//! - `program.rs` - one frame's execution state
//! - `gas.rs` - fork-parameterized cost formulas
//! - `opcodes.rs` / `table.rs` - opcode set and fork dispatch table
//! - `instructions/` - opcode handlers
//! - `precompiles/` - native contracts at addresses 0x01..0x05
//! - `call_manager.rs` - frame preparation, completion and result merging
//! - `interpreter.rs` - fetch/charge/execute loop

pub mod call_manager;
pub mod gas;
pub mod host;
pub mod instructions;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod program;
pub mod stack;
pub mod table;
pub mod word;

pub use call_manager::{Frame, Prepared, ReturnTarget, TxContext};
pub use host::{CallRequest, Control, CreateRequest, Host};
pub use interpreter::{InterruptHandle, Interpreter};
pub use memory::Memory;
pub use opcodes::Opcode;
pub use precompiles::{Precompile, PrecompileOutput, PrecompileRegistry};
pub use program::{HaltState, Invocation, Program};
pub use stack::Stack;
pub use table::{OpcodeInfo, OpcodeTable};
pub use word::Word;
