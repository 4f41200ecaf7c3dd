//! # Opcode Table
//!
//! Fork-scoped, data-driven dispatch: for every executable byte, its stack
//! arity, its base gas cost and its handler. Opcodes introduced by later forks
//! are simply absent from earlier tables and decode as illegal.

use super::host::Handler;
use super::instructions::{arithmetic, bitwise, block, environment, logging, stack_memory, system};
use super::opcodes::{Opcode, DUPS, LOGS, PUSHES, SWAPS};
use crate::domain::fork::{costs, Fork, ForkRules};
use std::fmt;

/// Static properties of one executable opcode.
#[derive(Clone, Copy)]
pub struct OpcodeInfo {
    /// The opcode.
    pub opcode: Opcode,
    /// Items popped.
    pub stack_in: usize,
    /// Items pushed.
    pub stack_out: usize,
    /// Gas charged before the handler runs.
    pub base_gas: u64,
    /// Handler.
    pub handler: Handler,
}

impl fmt::Debug for OpcodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpcodeInfo")
            .field("opcode", &self.opcode)
            .field("stack_in", &self.stack_in)
            .field("stack_out", &self.stack_out)
            .field("base_gas", &self.base_gas)
            .finish_non_exhaustive()
    }
}

/// Dispatch table for one set of rules.
#[derive(Clone)]
pub struct OpcodeTable {
    entries: [Option<OpcodeInfo>; 256],
}

impl OpcodeTable {
    /// Builds the table for `rules`.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn for_rules(rules: &ForkRules) -> Self {
        use costs::{BASE, HIGH, JUMPDEST, LOW, MID, VERY_LOW, ZERO};
        use Opcode as Op;

        let gas = &rules.gas;
        let mut table = Self {
            entries: [None; 256],
        };

        // 0x00 - arithmetic
        table.set(Op::Stop, 0, 0, ZERO, system::op_stop);
        table.set(Op::Add, 2, 1, VERY_LOW, arithmetic::op_add);
        table.set(Op::Mul, 2, 1, LOW, arithmetic::op_mul);
        table.set(Op::Sub, 2, 1, VERY_LOW, arithmetic::op_sub);
        table.set(Op::Div, 2, 1, LOW, arithmetic::op_div);
        table.set(Op::SDiv, 2, 1, LOW, arithmetic::op_sdiv);
        table.set(Op::Mod, 2, 1, LOW, arithmetic::op_mod);
        table.set(Op::SMod, 2, 1, LOW, arithmetic::op_smod);
        table.set(Op::AddMod, 3, 1, MID, arithmetic::op_addmod);
        table.set(Op::MulMod, 3, 1, MID, arithmetic::op_mulmod);
        table.set(Op::Exp, 2, 1, costs::EXP, arithmetic::op_exp);
        table.set(Op::SignExtend, 2, 1, LOW, arithmetic::op_signextend);

        // 0x10 - comparison and bitwise
        table.set(Op::Lt, 2, 1, VERY_LOW, bitwise::op_lt);
        table.set(Op::Gt, 2, 1, VERY_LOW, bitwise::op_gt);
        table.set(Op::SLt, 2, 1, VERY_LOW, bitwise::op_slt);
        table.set(Op::SGt, 2, 1, VERY_LOW, bitwise::op_sgt);
        table.set(Op::Eq, 2, 1, VERY_LOW, bitwise::op_eq);
        table.set(Op::IsZero, 1, 1, VERY_LOW, bitwise::op_iszero);
        table.set(Op::And, 2, 1, VERY_LOW, bitwise::op_and);
        table.set(Op::Or, 2, 1, VERY_LOW, bitwise::op_or);
        table.set(Op::Xor, 2, 1, VERY_LOW, bitwise::op_xor);
        table.set(Op::Not, 1, 1, VERY_LOW, bitwise::op_not);
        table.set(Op::Byte, 2, 1, VERY_LOW, bitwise::op_byte);
        table.set(Op::Sha3, 2, 1, gas.sha3, bitwise::op_sha3);

        // 0x30 - environment
        table.set(Op::Address, 0, 1, BASE, environment::op_address);
        table.set(Op::Balance, 1, 1, gas.balance, environment::op_balance);
        table.set(Op::Origin, 0, 1, BASE, environment::op_origin);
        table.set(Op::Caller, 0, 1, BASE, environment::op_caller);
        table.set(Op::CallValue, 0, 1, BASE, environment::op_callvalue);
        table.set(Op::CallDataLoad, 1, 1, VERY_LOW, environment::op_calldataload);
        table.set(Op::CallDataSize, 0, 1, BASE, environment::op_calldatasize);
        table.set(Op::CallDataCopy, 3, 0, VERY_LOW, environment::op_calldatacopy);
        table.set(Op::CodeSize, 0, 1, BASE, environment::op_codesize);
        table.set(Op::CodeCopy, 3, 0, VERY_LOW, environment::op_codecopy);
        table.set(Op::GasPrice, 0, 1, BASE, environment::op_gasprice);
        table.set(Op::ExtCodeSize, 1, 1, gas.ext_code, environment::op_extcodesize);
        table.set(Op::ExtCodeCopy, 4, 0, gas.ext_code, environment::op_extcodecopy);

        // 0x40 - block
        table.set(Op::BlockHash, 1, 1, gas.blockhash, block::op_blockhash);
        table.set(Op::Coinbase, 0, 1, BASE, block::op_coinbase);
        table.set(Op::Timestamp, 0, 1, BASE, block::op_timestamp);
        table.set(Op::Number, 0, 1, BASE, block::op_number);
        table.set(Op::Difficulty, 0, 1, BASE, block::op_difficulty);
        table.set(Op::GasLimit, 0, 1, BASE, block::op_gaslimit);

        // 0x50 - stack, memory, storage, flow
        table.set(Op::Pop, 1, 0, BASE, stack_memory::op_pop);
        table.set(Op::MLoad, 1, 1, VERY_LOW, stack_memory::op_mload);
        table.set(Op::MStore, 2, 0, VERY_LOW, stack_memory::op_mstore);
        table.set(Op::MStore8, 2, 0, VERY_LOW, stack_memory::op_mstore8);
        table.set(Op::SLoad, 1, 1, gas.sload, stack_memory::op_sload);
        table.set(Op::SStore, 2, 0, ZERO, stack_memory::op_sstore);
        table.set(Op::Jump, 1, 0, MID, stack_memory::op_jump);
        table.set(Op::JumpI, 2, 0, HIGH, stack_memory::op_jumpi);
        table.set(Op::Pc, 0, 1, BASE, stack_memory::op_pc);
        table.set(Op::MSize, 0, 1, BASE, stack_memory::op_msize);
        table.set(Op::Gas, 0, 1, BASE, stack_memory::op_gas);
        table.set(Op::JumpDest, 0, 0, JUMPDEST, stack_memory::op_jumpdest);

        // 0x60..0x9F - push, dup, swap
        let pushes: [Handler; 32] = [
            stack_memory::op_push::<1>,
            stack_memory::op_push::<2>,
            stack_memory::op_push::<3>,
            stack_memory::op_push::<4>,
            stack_memory::op_push::<5>,
            stack_memory::op_push::<6>,
            stack_memory::op_push::<7>,
            stack_memory::op_push::<8>,
            stack_memory::op_push::<9>,
            stack_memory::op_push::<10>,
            stack_memory::op_push::<11>,
            stack_memory::op_push::<12>,
            stack_memory::op_push::<13>,
            stack_memory::op_push::<14>,
            stack_memory::op_push::<15>,
            stack_memory::op_push::<16>,
            stack_memory::op_push::<17>,
            stack_memory::op_push::<18>,
            stack_memory::op_push::<19>,
            stack_memory::op_push::<20>,
            stack_memory::op_push::<21>,
            stack_memory::op_push::<22>,
            stack_memory::op_push::<23>,
            stack_memory::op_push::<24>,
            stack_memory::op_push::<25>,
            stack_memory::op_push::<26>,
            stack_memory::op_push::<27>,
            stack_memory::op_push::<28>,
            stack_memory::op_push::<29>,
            stack_memory::op_push::<30>,
            stack_memory::op_push::<31>,
            stack_memory::op_push::<32>,
        ];
        for (handler, op) in pushes.into_iter().zip(PUSHES) {
            table.set(op, 0, 1, VERY_LOW, handler);
        }

        let dups: [Handler; 16] = [
            stack_memory::op_dup::<1>,
            stack_memory::op_dup::<2>,
            stack_memory::op_dup::<3>,
            stack_memory::op_dup::<4>,
            stack_memory::op_dup::<5>,
            stack_memory::op_dup::<6>,
            stack_memory::op_dup::<7>,
            stack_memory::op_dup::<8>,
            stack_memory::op_dup::<9>,
            stack_memory::op_dup::<10>,
            stack_memory::op_dup::<11>,
            stack_memory::op_dup::<12>,
            stack_memory::op_dup::<13>,
            stack_memory::op_dup::<14>,
            stack_memory::op_dup::<15>,
            stack_memory::op_dup::<16>,
        ];
        for (depth, (handler, op)) in dups.into_iter().zip(DUPS).enumerate() {
            table.set(op, depth + 1, depth + 2, VERY_LOW, handler);
        }

        let swaps: [Handler; 16] = [
            stack_memory::op_swap::<1>,
            stack_memory::op_swap::<2>,
            stack_memory::op_swap::<3>,
            stack_memory::op_swap::<4>,
            stack_memory::op_swap::<5>,
            stack_memory::op_swap::<6>,
            stack_memory::op_swap::<7>,
            stack_memory::op_swap::<8>,
            stack_memory::op_swap::<9>,
            stack_memory::op_swap::<10>,
            stack_memory::op_swap::<11>,
            stack_memory::op_swap::<12>,
            stack_memory::op_swap::<13>,
            stack_memory::op_swap::<14>,
            stack_memory::op_swap::<15>,
            stack_memory::op_swap::<16>,
        ];
        for (depth, (handler, op)) in swaps.into_iter().zip(SWAPS).enumerate() {
            table.set(op, depth + 2, depth + 2, VERY_LOW, handler);
        }

        // 0xA0 - logging
        let logs: [Handler; 5] = [
            logging::op_log::<0>,
            logging::op_log::<1>,
            logging::op_log::<2>,
            logging::op_log::<3>,
            logging::op_log::<4>,
        ];
        for (topics, (handler, op)) in logs.into_iter().zip(LOGS).enumerate() {
            let base = gas.log + gas.log_topic * topics as u64;
            table.set(op, topics + 2, 0, base, handler);
        }

        // 0xF0 - system
        table.set(Op::Create, 3, 1, gas.create, system::op_create);
        table.set(Op::Call, 7, 1, gas.call, system::op_call);
        table.set(Op::CallCode, 7, 1, gas.call, system::op_callcode);
        table.set(Op::Return, 2, 0, ZERO, system::op_return);
        table.set(Op::SelfDestruct, 1, 0, gas.selfdestruct, system::op_selfdestruct);

        if rules.is_active(Fork::Homestead) {
            table.set(Op::DelegateCall, 6, 1, gas.call, system::op_delegatecall);
        }
        if rules.is_active(Fork::Byzantium) {
            table.set(Op::ReturnDataSize, 0, 1, BASE, environment::op_returndatasize);
            table.set(Op::ReturnDataCopy, 3, 0, VERY_LOW, environment::op_returndatacopy);
            table.set(Op::StaticCall, 6, 1, gas.call, system::op_staticcall);
            table.set(Op::Revert, 2, 0, ZERO, system::op_revert);
        }
        if rules.is_active(Fork::Constantinople) {
            table.set(Op::Shl, 2, 1, VERY_LOW, bitwise::op_shl);
            table.set(Op::Shr, 2, 1, VERY_LOW, bitwise::op_shr);
            table.set(Op::Sar, 2, 1, VERY_LOW, bitwise::op_sar);
            table.set(Op::ExtCodeHash, 1, 1, gas.ext_code_hash, environment::op_extcodehash);
            table.set(Op::Create2, 4, 1, gas.create, system::op_create2);
        }
        if rules.is_active(Fork::Istanbul) {
            table.set(Op::ChainId, 0, 1, BASE, block::op_chainid);
            table.set(Op::SelfBalance, 0, 1, LOW, block::op_selfbalance);
        }

        table
    }

    fn set(
        &mut self,
        opcode: Opcode,
        stack_in: usize,
        stack_out: usize,
        base_gas: u64,
        handler: Handler,
    ) {
        self.entries[usize::from(opcode.byte())] = Some(OpcodeInfo {
            opcode,
            stack_in,
            stack_out,
            base_gas,
            handler,
        });
    }

    /// Entry for `byte`; `None` if the byte is not executable under these
    /// rules.
    #[must_use]
    pub fn get(&self, byte: u8) -> Option<&OpcodeInfo> {
        self.entries[usize::from(byte)].as_ref()
    }

    /// Number of executable opcodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for OpcodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpcodeTable")
            .field("opcodes", &self.len())
            .finish()
    }
}
