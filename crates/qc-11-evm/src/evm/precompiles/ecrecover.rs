//! # Ecrecover Precompile (0x01)
//!
//! Recovers the signer address from an ECDSA signature.
//!
//! Input format (128 bytes, zero-padded when shorter):
//! - bytes 0-31: message hash
//! - bytes 32-63: v (27 or 28, as a full word)
//! - bytes 64-95: r
//! - bytes 96-127: s
//!
//! Output is the address left-padded to 32 bytes, or empty when the signature
//! does not recover. Invalid signatures never fail the call.

use std::sync::Arc;

use super::{charge, precompile_address, Precompile, PrecompileOutput};
use crate::domain::value_objects::{Address, Bytes, EcdsaSignature, Hash};
use crate::errors::PrecompileError;
use crate::ports::outbound::SignatureVerifier;

/// Fixed gas cost for ecrecover.
const ECRECOVER_GAS: u64 = 3000;

/// Ecrecover precompile.
pub struct Ecrecover {
    verifier: Arc<dyn SignatureVerifier>,
}

impl Ecrecover {
    /// Creates the precompile over `verifier`.
    #[must_use]
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { verifier }
    }

    fn recover(&self, input: &[u8; 128]) -> Option<Address> {
        // v is a full word: anything but 27 or 28 in the low byte is invalid.
        if input[32..63].iter().any(|&b| b != 0) {
            return None;
        }
        let v = input[63];
        if v != 27 && v != 28 {
            return None;
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&input[..32]);
        let mut r = [0u8; 32];
        r.copy_from_slice(&input[64..96]);
        let mut s = [0u8; 32];
        s.copy_from_slice(&input[96..128]);

        self.verifier
            .ecrecover(&Hash::new(hash), &EcdsaSignature::new(r, s, v))
    }
}

impl Precompile for Ecrecover {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let gas_used = charge(ECRECOVER_GAS, gas_limit)?;

        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        let output = match self.recover(&padded) {
            Some(address) => {
                let mut word = vec![0u8; 32];
                word[12..].copy_from_slice(address.as_bytes());
                Bytes::from_vec(word)
            }
            None => Bytes::new(),
        };
        Ok(PrecompileOutput { gas_used, output })
    }

    fn address(&self) -> Address {
        precompile_address(1)
    }
}
