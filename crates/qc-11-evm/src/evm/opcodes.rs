//! # EVM Opcodes
//!
//! Opcode definitions and bytecode analysis. Which opcodes are actually
//! executable, and at what price, is decided per fork by
//! [`OpcodeTable`](super::table::OpcodeTable).

use std::fmt;

/// EVM opcode, Istanbul instruction set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // 0x00 - Stop and Arithmetic
    Stop = 0x00,
    Add = 0x01,
    Mul = 0x02,
    Sub = 0x03,
    Div = 0x04,
    SDiv = 0x05,
    Mod = 0x06,
    SMod = 0x07,
    AddMod = 0x08,
    MulMod = 0x09,
    Exp = 0x0A,
    SignExtend = 0x0B,

    // 0x10 - Comparison & Bitwise
    Lt = 0x10,
    Gt = 0x11,
    SLt = 0x12,
    SGt = 0x13,
    Eq = 0x14,
    IsZero = 0x15,
    And = 0x16,
    Or = 0x17,
    Xor = 0x18,
    Not = 0x19,
    Byte = 0x1A,
    Shl = 0x1B,
    Shr = 0x1C,
    Sar = 0x1D,

    // 0x20 - Hashing
    Sha3 = 0x20,

    // 0x30 - Environmental Information
    Address = 0x30,
    Balance = 0x31,
    Origin = 0x32,
    Caller = 0x33,
    CallValue = 0x34,
    CallDataLoad = 0x35,
    CallDataSize = 0x36,
    CallDataCopy = 0x37,
    CodeSize = 0x38,
    CodeCopy = 0x39,
    GasPrice = 0x3A,
    ExtCodeSize = 0x3B,
    ExtCodeCopy = 0x3C,
    ReturnDataSize = 0x3D,
    ReturnDataCopy = 0x3E,
    ExtCodeHash = 0x3F,

    // 0x40 - Block Information
    BlockHash = 0x40,
    Coinbase = 0x41,
    Timestamp = 0x42,
    Number = 0x43,
    Difficulty = 0x44,
    GasLimit = 0x45,
    ChainId = 0x46,
    SelfBalance = 0x47,

    // 0x50 - Stack, Memory, Storage, Flow
    Pop = 0x50,
    MLoad = 0x51,
    MStore = 0x52,
    MStore8 = 0x53,
    SLoad = 0x54,
    SStore = 0x55,
    Jump = 0x56,
    JumpI = 0x57,
    Pc = 0x58,
    MSize = 0x59,
    Gas = 0x5A,
    JumpDest = 0x5B,

    // 0x60-0x7F - Push
    Push1 = 0x60,
    Push2 = 0x61,
    Push3 = 0x62,
    Push4 = 0x63,
    Push5 = 0x64,
    Push6 = 0x65,
    Push7 = 0x66,
    Push8 = 0x67,
    Push9 = 0x68,
    Push10 = 0x69,
    Push11 = 0x6A,
    Push12 = 0x6B,
    Push13 = 0x6C,
    Push14 = 0x6D,
    Push15 = 0x6E,
    Push16 = 0x6F,
    Push17 = 0x70,
    Push18 = 0x71,
    Push19 = 0x72,
    Push20 = 0x73,
    Push21 = 0x74,
    Push22 = 0x75,
    Push23 = 0x76,
    Push24 = 0x77,
    Push25 = 0x78,
    Push26 = 0x79,
    Push27 = 0x7A,
    Push28 = 0x7B,
    Push29 = 0x7C,
    Push30 = 0x7D,
    Push31 = 0x7E,
    Push32 = 0x7F,

    // 0x80-0x8F - Dup
    Dup1 = 0x80,
    Dup2 = 0x81,
    Dup3 = 0x82,
    Dup4 = 0x83,
    Dup5 = 0x84,
    Dup6 = 0x85,
    Dup7 = 0x86,
    Dup8 = 0x87,
    Dup9 = 0x88,
    Dup10 = 0x89,
    Dup11 = 0x8A,
    Dup12 = 0x8B,
    Dup13 = 0x8C,
    Dup14 = 0x8D,
    Dup15 = 0x8E,
    Dup16 = 0x8F,

    // 0x90-0x9F - Swap
    Swap1 = 0x90,
    Swap2 = 0x91,
    Swap3 = 0x92,
    Swap4 = 0x93,
    Swap5 = 0x94,
    Swap6 = 0x95,
    Swap7 = 0x96,
    Swap8 = 0x97,
    Swap9 = 0x98,
    Swap10 = 0x99,
    Swap11 = 0x9A,
    Swap12 = 0x9B,
    Swap13 = 0x9C,
    Swap14 = 0x9D,
    Swap15 = 0x9E,
    Swap16 = 0x9F,

    // 0xA0-0xA4 - Log
    Log0 = 0xA0,
    Log1 = 0xA1,
    Log2 = 0xA2,
    Log3 = 0xA3,
    Log4 = 0xA4,

    // 0xF0-0xFF - System
    Create = 0xF0,
    Call = 0xF1,
    CallCode = 0xF2,
    Return = 0xF3,
    DelegateCall = 0xF4,
    Create2 = 0xF5,
    StaticCall = 0xFA,
    Revert = 0xFD,
    SelfDestruct = 0xFF,
}

/// Push opcodes in order, indexed by `byte - 0x60`.
pub const PUSHES: [Opcode; 32] = [
    Opcode::Push1, Opcode::Push2, Opcode::Push3, Opcode::Push4,
    Opcode::Push5, Opcode::Push6, Opcode::Push7, Opcode::Push8,
    Opcode::Push9, Opcode::Push10, Opcode::Push11, Opcode::Push12,
    Opcode::Push13, Opcode::Push14, Opcode::Push15, Opcode::Push16,
    Opcode::Push17, Opcode::Push18, Opcode::Push19, Opcode::Push20,
    Opcode::Push21, Opcode::Push22, Opcode::Push23, Opcode::Push24,
    Opcode::Push25, Opcode::Push26, Opcode::Push27, Opcode::Push28,
    Opcode::Push29, Opcode::Push30, Opcode::Push31, Opcode::Push32,
];

/// Dup opcodes in order, indexed by `byte - 0x80`.
pub const DUPS: [Opcode; 16] = [
    Opcode::Dup1, Opcode::Dup2, Opcode::Dup3, Opcode::Dup4,
    Opcode::Dup5, Opcode::Dup6, Opcode::Dup7, Opcode::Dup8,
    Opcode::Dup9, Opcode::Dup10, Opcode::Dup11, Opcode::Dup12,
    Opcode::Dup13, Opcode::Dup14, Opcode::Dup15, Opcode::Dup16,
];

/// Swap opcodes in order, indexed by `byte - 0x90`.
pub const SWAPS: [Opcode; 16] = [
    Opcode::Swap1, Opcode::Swap2, Opcode::Swap3, Opcode::Swap4,
    Opcode::Swap5, Opcode::Swap6, Opcode::Swap7, Opcode::Swap8,
    Opcode::Swap9, Opcode::Swap10, Opcode::Swap11, Opcode::Swap12,
    Opcode::Swap13, Opcode::Swap14, Opcode::Swap15, Opcode::Swap16,
];

/// Log opcodes in order, indexed by topic count.
pub const LOGS: [Opcode; 5] = [
    Opcode::Log0,
    Opcode::Log1,
    Opcode::Log2,
    Opcode::Log3,
    Opcode::Log4,
];

impl Opcode {
    /// Decodes a byte. `None` for bytes outside the Istanbul set (including
    /// the designated invalid 0xFE).
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        let opcode = match byte {
            0x00 => Self::Stop,
            0x01 => Self::Add,
            0x02 => Self::Mul,
            0x03 => Self::Sub,
            0x04 => Self::Div,
            0x05 => Self::SDiv,
            0x06 => Self::Mod,
            0x07 => Self::SMod,
            0x08 => Self::AddMod,
            0x09 => Self::MulMod,
            0x0A => Self::Exp,
            0x0B => Self::SignExtend,

            0x10 => Self::Lt,
            0x11 => Self::Gt,
            0x12 => Self::SLt,
            0x13 => Self::SGt,
            0x14 => Self::Eq,
            0x15 => Self::IsZero,
            0x16 => Self::And,
            0x17 => Self::Or,
            0x18 => Self::Xor,
            0x19 => Self::Not,
            0x1A => Self::Byte,
            0x1B => Self::Shl,
            0x1C => Self::Shr,
            0x1D => Self::Sar,

            0x20 => Self::Sha3,

            0x30 => Self::Address,
            0x31 => Self::Balance,
            0x32 => Self::Origin,
            0x33 => Self::Caller,
            0x34 => Self::CallValue,
            0x35 => Self::CallDataLoad,
            0x36 => Self::CallDataSize,
            0x37 => Self::CallDataCopy,
            0x38 => Self::CodeSize,
            0x39 => Self::CodeCopy,
            0x3A => Self::GasPrice,
            0x3B => Self::ExtCodeSize,
            0x3C => Self::ExtCodeCopy,
            0x3D => Self::ReturnDataSize,
            0x3E => Self::ReturnDataCopy,
            0x3F => Self::ExtCodeHash,

            0x40 => Self::BlockHash,
            0x41 => Self::Coinbase,
            0x42 => Self::Timestamp,
            0x43 => Self::Number,
            0x44 => Self::Difficulty,
            0x45 => Self::GasLimit,
            0x46 => Self::ChainId,
            0x47 => Self::SelfBalance,

            0x50 => Self::Pop,
            0x51 => Self::MLoad,
            0x52 => Self::MStore,
            0x53 => Self::MStore8,
            0x54 => Self::SLoad,
            0x55 => Self::SStore,
            0x56 => Self::Jump,
            0x57 => Self::JumpI,
            0x58 => Self::Pc,
            0x59 => Self::MSize,
            0x5A => Self::Gas,
            0x5B => Self::JumpDest,

            0x60..=0x7F => PUSHES[usize::from(byte - 0x60)],
            0x80..=0x8F => DUPS[usize::from(byte - 0x80)],
            0x90..=0x9F => SWAPS[usize::from(byte - 0x90)],
            0xA0..=0xA4 => LOGS[usize::from(byte - 0xA0)],

            0xF0 => Self::Create,
            0xF1 => Self::Call,
            0xF2 => Self::CallCode,
            0xF3 => Self::Return,
            0xF4 => Self::DelegateCall,
            0xF5 => Self::Create2,
            0xFA => Self::StaticCall,
            0xFD => Self::Revert,
            0xFF => Self::SelfDestruct,

            _ => return None,
        };
        Some(opcode)
    }

    /// The opcode byte.
    #[must_use]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Number of immediate bytes for PUSH opcodes.
    #[must_use]
    pub fn push_size(self) -> Option<usize> {
        push_size(self as u8)
    }

    /// Topic count for LOG opcodes.
    #[must_use]
    pub fn log_topics(self) -> Option<usize> {
        let byte = self as u8;
        (0xA0..=0xA4)
            .contains(&byte)
            .then(|| usize::from(byte - 0xA0))
    }

    /// Returns true if this opcode halts the frame.
    #[must_use]
    pub fn is_terminating(self) -> bool {
        matches!(
            self,
            Self::Stop | Self::Return | Self::Revert | Self::SelfDestruct
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{self:?}").to_uppercase();
        f.write_str(&name)
    }
}

/// Immediate byte count of a raw PUSH byte.
#[must_use]
pub fn push_size(byte: u8) -> Option<usize> {
    (0x60..=0x7F)
        .contains(&byte)
        .then(|| usize::from(byte - 0x5F))
}

// =============================================================================
// JUMP DESTINATION ANALYSIS
// =============================================================================

/// Valid JUMPDEST positions of one code blob.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JumpDestinations {
    valid: Vec<bool>,
}

impl JumpDestinations {
    /// Returns true if `pc` is a JUMPDEST outside PUSH immediates.
    #[must_use]
    pub fn contains(&self, pc: usize) -> bool {
        self.valid.get(pc).copied().unwrap_or(false)
    }

    /// Number of valid destinations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.valid.iter().filter(|valid| **valid).count()
    }
}

/// Scans `code` for JUMPDEST bytes, skipping PUSH immediates.
#[must_use]
pub fn analyze_jump_destinations(code: &[u8]) -> JumpDestinations {
    let mut valid = vec![false; code.len()];
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        if byte == Opcode::JumpDest as u8 {
            valid[pc] = true;
        }
        pc += 1 + push_size(byte).unwrap_or(0);
    }
    JumpDestinations { valid }
}

// =============================================================================
// TESTS
// =============================================================================
