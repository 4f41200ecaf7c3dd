//! # Driven Ports (SPI - Outbound)
//!
//! Collaborators the engine depends on:
//! - Account and storage state (`Repository`)
//! - Historical block hashes (`BlockHashes`)
//! - Public-key recovery for ECRECOVER (`SignatureVerifier`)
//!
//! All of them are synchronous. No opcode waits on I/O: the host must already
//! hold, or fetch inline, whatever the bytecode touches.

use crate::domain::value_objects::{Address, Bytes, EcdsaSignature, Hash, U256};
use crate::errors::StateError;
use crate::evm::word::Word;

// =============================================================================
// REPOSITORY (account/storage state)
// =============================================================================

/// Account and storage state with nested checkpoints.
///
/// ## Checkpoint discipline
///
/// Every frame entry calls [`Repository::start_tracking`]; the matching frame
/// exit calls exactly one of [`Repository::commit`] (fold the checkpoint into
/// its parent) or [`Repository::rollback`] (discard everything written since the
/// checkpoint). The executor wraps the whole transaction in one more
/// checkpoint, so the stack is never empty while bytecode runs.
pub trait Repository: Send {
    /// Balance of `address` (zero if absent).
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn get_balance(&self, address: Address) -> Result<U256, StateError>;

    /// Credits `amount`, creating the account if needed.
    ///
    /// # Errors
    ///
    /// `BalanceOverflow` if the result exceeds 256 bits.
    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;

    /// Debits `amount`.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if the balance is smaller than `amount`.
    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;

    /// Nonce of `address` (zero if absent).
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn get_nonce(&self, address: Address) -> Result<u64, StateError>;

    /// Increments the nonce, creating the account if needed, and returns the
    /// nonce before the increment.
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn increase_nonce(&mut self, address: Address) -> Result<u64, StateError>;

    /// Code of `address` (empty if absent).
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn get_code(&self, address: Address) -> Result<Bytes, StateError>;

    /// Stores `code` at an existing account.
    ///
    /// # Errors
    ///
    /// `NotFound` if the account does not exist.
    fn save_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError>;

    /// Keccak-256 of the code (the empty-code hash for accounts without code,
    /// zero for absent accounts).
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn get_code_hash(&self, address: Address) -> Result<Hash, StateError>;

    /// Current value of a storage slot (zero if never written).
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn get_storage_value(&self, address: Address, key: Word) -> Result<Word, StateError>;

    /// Writes a storage slot.
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn add_storage_row(&mut self, address: Address, key: Word, value: Word) -> Result<(), StateError>;

    /// Value the slot held when the outermost open checkpoint was taken
    /// (net SSTORE metering).
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn get_original_storage_value(&self, address: Address, key: Word) -> Result<Word, StateError>;

    /// Creates (or resets) an account, keeping any balance already sent to the
    /// address. Code, storage and nonce start empty.
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn create_account(&mut self, address: Address) -> Result<(), StateError>;

    /// Returns true if the account exists in state.
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn is_exist(&self, address: Address) -> Result<bool, StateError>;

    /// Returns true if the account is absent or has zero nonce, zero balance
    /// and no code.
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn is_empty(&self, address: Address) -> Result<bool, StateError> {
        Ok(self.get_nonce(address)? == 0
            && self.get_balance(address)?.is_zero()
            && self.get_code(address)?.is_empty())
    }

    /// Removes the account with its code and storage.
    ///
    /// # Errors
    ///
    /// Host-specific failures.
    fn delete(&mut self, address: Address) -> Result<(), StateError>;

    /// Opens a nested checkpoint.
    fn start_tracking(&mut self);

    /// Folds the innermost checkpoint into its parent.
    ///
    /// # Errors
    ///
    /// `NoCheckpoint` if no checkpoint is open.
    fn commit(&mut self) -> Result<(), StateError>;

    /// Discards every write since the innermost checkpoint.
    ///
    /// # Errors
    ///
    /// `NoCheckpoint` if no checkpoint is open.
    fn rollback(&mut self) -> Result<(), StateError>;
}

// =============================================================================
// BLOCK HASHES (BLOCKHASH opcode)
// =============================================================================

/// Historical block hashes by number.
///
/// The 256-block window is enforced by the engine; implementations only answer
/// for blocks they know.
pub trait BlockHashes: Send + Sync {
    /// Hash of block `number`, if known.
    fn block_hash(&self, number: u64) -> Option<Hash>;
}

// =============================================================================
// SIGNATURE VERIFIER (ECRECOVER precompile)
// =============================================================================

/// Public-key recovery used by the ecrecover precompile (0x01).
pub trait SignatureVerifier: Send + Sync {
    /// Recovers the signer address of `hash`.
    ///
    /// # Returns
    ///
    /// * `Some(Address)` - Recovered signer address
    /// * `None` - If the signature is invalid
    fn ecrecover(&self, hash: &Hash, signature: &EcdsaSignature) -> Option<Address>;
}

// =============================================================================
// TESTS
// =============================================================================
