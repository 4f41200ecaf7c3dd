//! # Signature Adapter
//!
//! secp256k1 public-key recovery with `k256`, backing the ecrecover precompile.
//!
//! Unlike transaction signature checks, ecrecover accepts high-S signatures:
//! they are normalized before recovery with the recovery id flipped to match.

use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, EcdsaSignature, Hash};
use crate::ports::outbound::SignatureVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Default [`SignatureVerifier`].
#[derive(Clone, Copy, Debug, Default)]
pub struct K256Verifier;

impl K256Verifier {
    /// Creates the verifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SignatureVerifier for K256Verifier {
    fn ecrecover(&self, hash: &Hash, signature: &EcdsaSignature) -> Option<Address> {
        let v = signature.normalized_v();
        if v > 1 {
            return None;
        }

        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&signature.r);
        sig_bytes[32..].copy_from_slice(&signature.s);
        let mut sig = Signature::from_slice(&sig_bytes).ok()?;
        let mut recovery_id = RecoveryId::try_from(v).ok()?;

        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        let recovered_key =
            VerifyingKey::recover_from_prehash(hash.as_bytes(), &sig, recovery_id).ok()?;

        // Uncompressed SEC1 point: 0x04 || x || y
        let pubkey_bytes = recovered_key.to_encoded_point(false);
        let digest = keccak256(&pubkey_bytes.as_bytes()[1..]);
        Address::from_slice(&digest.as_bytes()[12..])
    }
}
