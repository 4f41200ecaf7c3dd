//! # Core Domain Entities
//!
//! Invocation inputs and execution outputs exchanged between the engine and the
//! enclosing transaction pipeline.

use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::ExceptionKind;
use serde::{Deserialize, Serialize};

// =============================================================================
// BLOCK CONTEXT
// =============================================================================

/// Block-level environment visible to bytecode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block number.
    pub number: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Coinbase address (block proposer).
    pub coinbase: Address,
    /// Block difficulty.
    pub difficulty: U256,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Chain ID (CHAINID opcode).
    pub chain_id: u64,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            difficulty: U256::zero(),
            gas_limit: 30_000_000,
            chain_id: 1,
        }
    }
}

// =============================================================================
// MESSAGE (top-level invocation)
// =============================================================================

/// A transaction as seen by the engine: already validated and paid for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender; also the origin of every nested frame.
    pub caller: Address,
    /// Target account, or `None` for contract creation.
    pub to: Option<Address>,
    /// Value transferred (wei).
    pub value: U256,
    /// Calldata, or init code for creation.
    pub data: Bytes,
    /// Gas limit including the intrinsic cost.
    pub gas_limit: u64,
    /// Gas price (GASPRICE opcode).
    pub gas_price: U256,
}

impl Message {
    /// A message call.
    #[must_use]
    pub fn call(caller: Address, to: Address, value: U256, data: Bytes, gas_limit: u64) -> Self {
        Self {
            caller,
            to: Some(to),
            value,
            data,
            gas_limit,
            gas_price: U256::zero(),
        }
    }

    /// A contract creation.
    #[must_use]
    pub fn create(caller: Address, value: U256, init_code: Bytes, gas_limit: u64) -> Self {
        Self {
            caller,
            to: None,
            value,
            data: init_code,
            gas_limit,
            gas_price: U256::zero(),
        }
    }

    /// Sets the gas price.
    #[must_use]
    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Returns true for contract creation.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

// =============================================================================
// CALL KIND
// =============================================================================

/// How a frame was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    /// CALL or a top-level message call.
    Call,
    /// CALLCODE: callee code runs against the caller's account.
    CallCode,
    /// DELEGATECALL: like CALLCODE, keeping caller and value.
    DelegateCall,
    /// STATICCALL: no state modification below this frame.
    StaticCall,
    /// CREATE or a top-level creation.
    Create,
    /// CREATE2.
    Create2,
}

impl CallKind {
    /// Returns true for the creation kinds.
    #[must_use]
    pub fn is_create(self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }
}

// =============================================================================
// LOG (EVENT)
// =============================================================================

/// Emitted log (event) from contract execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

// =============================================================================
// CALL RESULT
// =============================================================================

/// Outcome of one frame, produced exactly once when the frame is consumed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallResult {
    /// True if the frame halted normally.
    pub success: bool,
    /// Gas consumed out of what the frame was given.
    pub gas_used: u64,
    /// Gas handed back to the caller.
    pub gas_left: u64,
    /// Net refund counter accumulated by the frame and its successful children.
    /// Negative values cancel refunds granted earlier in the transaction.
    pub gas_refunded: i64,
    /// RETURN data on success, REVERT data on revert, empty on exception.
    pub return_data: Bytes,
    /// Logs emitted by the frame and its successful children.
    pub logs: Vec<Log>,
    /// Address of the created contract (successful CREATE/CREATE2 only).
    pub new_address: Option<Address>,
    /// True if the frame halted via REVERT.
    pub reverted: bool,
    /// Set when the frame halted with an exception.
    pub exception: Option<ExceptionKind>,
    /// Accounts scheduled for deletion by SELFDESTRUCT.
    pub destroyed: Vec<Address>,
}

impl CallResult {
    /// A successful frame that never ran code (precompile or empty account).
    #[must_use]
    pub fn success(gas_limit: u64, gas_used: u64, return_data: Bytes) -> Self {
        Self {
            success: true,
            gas_used,
            gas_left: gas_limit.saturating_sub(gas_used),
            return_data,
            ..Self::default()
        }
    }

    /// A frame that failed before or without running code.
    ///
    /// Exceptions forfeit all gas; plain failures (depth, balance) hand it back.
    #[must_use]
    pub fn failure(gas_limit: u64, exception: Option<ExceptionKind>) -> Self {
        let gas_left = if exception.is_some() { 0 } else { gas_limit };
        Self {
            success: false,
            gas_used: gas_limit - gas_left,
            gas_left,
            exception,
            ..Self::default()
        }
    }

    /// Decodes a Solidity `Error(string)` revert payload.
    #[must_use]
    pub fn revert_reason(&self) -> Option<String> {
        if self.success {
            return None;
        }
        decode_revert_reason(&self.return_data)
    }
}

/// Attempts to decode a revert reason from output data.
fn decode_revert_reason(data: &Bytes) -> Option<String> {
    // Error(string) selector: 0x08c379a0
    let data = data.as_slice();
    if data.len() < 68 || data[0..4] != [0x08, 0xc3, 0x79, 0xa0] {
        return None;
    }

    // Skip selector (4) + offset (32)
    let offset = 4 + 32;
    let len = U256::from_big_endian(&data[offset..offset + 32]);
    if len > U256::from(data.len()) {
        return None;
    }
    let len = len.low_u64() as usize;
    let start = offset + 32;
    let bytes = data.get(start..start + len)?;
    String::from_utf8(bytes.to_vec()).ok()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_reason(reason: &str) -> Bytes {
        let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
        let mut offset = [0u8; 32];
        offset[31] = 0x20;
        data.extend_from_slice(&offset);
        let mut len = [0u8; 32];
        len[31] = reason.len() as u8;
        data.extend_from_slice(&len);
        let mut body = reason.as_bytes().to_vec();
        body.resize(reason.len().div_ceil(32) * 32, 0);
        data.extend_from_slice(&body);
        Bytes::from_vec(data)
    }

    #[test]
    fn test_message_constructors() {
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);
        let call = Message::call(a, b, U256::from(5), Bytes::new(), 100_000);
        assert!(!call.is_create());
        assert_eq!(call.to, Some(b));

        let create = Message::create(a, U256::zero(), Bytes::from_slice(&[0x00]), 100_000)
            .with_gas_price(U256::from(7));
        assert!(create.is_create());
        assert_eq!(create.gas_price, U256::from(7));
    }

    #[test]
    fn test_call_kind_is_create() {
        assert!(CallKind::Create.is_create());
        assert!(CallKind::Create2.is_create());
        assert!(!CallKind::DelegateCall.is_create());
    }

    #[test]
    fn test_call_result_failure_gas() {
        let plain = CallResult::failure(1000, None);
        assert_eq!(plain.gas_left, 1000);
        assert_eq!(plain.gas_used, 0);

        let oog = CallResult::failure(1000, Some(ExceptionKind::OutOfGas));
        assert_eq!(oog.gas_left, 0);
        assert_eq!(oog.gas_used, 1000);
    }

    #[test]
    fn test_revert_reason_decoding() {
        let result = CallResult {
            success: false,
            reverted: true,
            return_data: encode_reason("not owner"),
            ..CallResult::default()
        };
        assert_eq!(result.revert_reason(), Some("not owner".to_string()));
    }

    #[test]
    fn test_revert_reason_ignores_garbage() {
        let result = CallResult {
            success: false,
            return_data: Bytes::from_slice(&[1, 2, 3]),
            ..CallResult::default()
        };
        assert_eq!(result.revert_reason(), None);
    }
}
