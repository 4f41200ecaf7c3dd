//! Block information: 0x40-0x47.

use super::push;
use crate::errors::VmError;
use crate::evm::host::{Control, Host};
use crate::evm::program::Program;
use crate::evm::word::Word;

/// How far back BLOCKHASH can see.
pub const BLOCKHASH_WINDOW: u64 = 256;

/// BLOCKHASH. Zero unless the block is one of the 256 before the current one
/// and the oracle knows it.
pub fn op_blockhash(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let requested = program.stack_mut().pop()?;
    let current = program.env().block.number;

    let hash = match requested.to_u64() {
        Ok(number) if number < current && current - number <= BLOCKHASH_WINDOW => host
            .block_hashes
            .block_hash(number)
            .map_or(Word::ZERO, |hash| Word::from_be_bytes(*hash.as_bytes())),
        _ => Word::ZERO,
    };
    push(program, hash)
}

/// COINBASE
pub fn op_coinbase(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let coinbase = program.env().block.coinbase;
    push(program, coinbase)
}

/// TIMESTAMP
pub fn op_timestamp(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let timestamp = program.env().block.timestamp;
    push(program, timestamp)
}

/// NUMBER
pub fn op_number(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let number = program.env().block.number;
    push(program, number)
}

/// DIFFICULTY
pub fn op_difficulty(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let difficulty = program.env().block.difficulty;
    push(program, difficulty)
}

/// GASLIMIT
pub fn op_gaslimit(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let gas_limit = program.env().block.gas_limit;
    push(program, gas_limit)
}

/// CHAINID
pub fn op_chainid(program: &mut Program, _host: &mut Host<'_>) -> Result<Control, VmError> {
    let chain_id = program.env().block.chain_id;
    push(program, chain_id)
}

/// SELFBALANCE
pub fn op_selfbalance(program: &mut Program, host: &mut Host<'_>) -> Result<Control, VmError> {
    let balance = host.repo.get_balance(program.env().address)?;
    push(program, balance)
}
