//! # State Adapter
//!
//! In-memory [`Repository`] for tests, simulation and embedding.
//!
//! Checkpoints are kept as an undo journal: every mutation records the value
//! it replaced, `rollback` replays the entries recorded since the checkpoint in
//! reverse, and `commit` simply hands them to the enclosing checkpoint.

use crate::domain::services::{keccak256, EMPTY_CODE_HASH};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::StateError;
use crate::evm::word::Word;
use crate::ports::outbound::Repository;
use std::collections::HashMap;

/// Account fields other than storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    /// Balance in wei.
    pub balance: U256,
    /// Transaction / creation counter.
    pub nonce: u64,
    /// Deployed code.
    pub code: Bytes,
    /// Keccak-256 of `code`.
    pub code_hash: Hash,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code: Bytes::new(),
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

#[derive(Clone, Debug)]
enum JournalEntry {
    Account {
        address: Address,
        previous: Option<AccountInfo>,
    },
    Storage {
        address: Address,
        key: Word,
        previous: Option<Word>,
    },
}

/// In-memory account state with nested checkpoints.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    accounts: HashMap<Address, AccountInfo>,
    storage: HashMap<(Address, Word), Word>,
    journal: Vec<JournalEntry>,
    /// Journal length at each open checkpoint.
    checkpoints: Vec<usize>,
    /// Slot values as of the outermost open checkpoint.
    originals: HashMap<(Address, Word), Word>,
}

impl InMemoryRepository {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Setup (not journaled)
    // -------------------------------------------------------------------------

    /// Set balance for an address, creating the account.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Set nonce for an address, creating the account.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.accounts.entry(address).or_default().nonce = nonce;
    }

    /// Set code for an address, creating the account.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let account = self.accounts.entry(address).or_default();
        account.code_hash = code_hash_of(&code);
        account.code = code;
    }

    /// Set a storage slot directly.
    pub fn set_storage(&mut self, address: Address, key: Word, value: Word) {
        self.accounts.entry(address).or_default();
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
    }

    /// Builder form of [`InMemoryRepository::set_balance`].
    #[must_use]
    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.set_balance(address, balance);
        self
    }

    /// Builder form of [`InMemoryRepository::set_code`].
    #[must_use]
    pub fn with_code(mut self, address: Address, code: Bytes) -> Self {
        self.set_code(address, code);
        self
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Account fields, if the account exists.
    #[must_use]
    pub fn account(&self, address: Address) -> Option<&AccountInfo> {
        self.accounts.get(&address)
    }

    /// Number of existing accounts.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Non-zero storage slots of `address`.
    #[must_use]
    pub fn storage_of(&self, address: Address) -> HashMap<Word, Word> {
        self.storage
            .iter()
            .filter(|((owner, _), _)| *owner == address)
            .map(|((_, key), value)| (*key, *value))
            .collect()
    }

    /// Number of open checkpoints.
    #[must_use]
    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }

    // -------------------------------------------------------------------------
    // Journaled mutation
    // -------------------------------------------------------------------------

    fn record_account(&mut self, address: Address) {
        if self.checkpoints.is_empty() {
            return;
        }
        let previous = self.accounts.get(&address).cloned();
        self.journal.push(JournalEntry::Account { address, previous });
    }

    fn account_mut(&mut self, address: Address) -> &mut AccountInfo {
        self.record_account(address);
        self.accounts.entry(address).or_default()
    }

    fn write_slot(&mut self, address: Address, key: Word, value: Word) {
        let previous = self.storage.get(&(address, key)).copied();
        if !self.checkpoints.is_empty() {
            self.originals
                .entry((address, key))
                .or_insert_with(|| previous.unwrap_or_default());
            self.journal.push(JournalEntry::Storage {
                address,
                key,
                previous,
            });
        }
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
    }

    fn clear_storage(&mut self, address: Address) {
        let keys: Vec<Word> = self
            .storage
            .keys()
            .filter(|(owner, _)| *owner == address)
            .map(|(_, key)| *key)
            .collect();
        for key in keys {
            self.write_slot(address, key, Word::ZERO);
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Account { address, previous } => match previous {
                Some(info) => {
                    self.accounts.insert(address, info);
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            JournalEntry::Storage {
                address,
                key,
                previous,
            } => match previous {
                Some(value) => {
                    self.storage.insert((address, key), value);
                }
                None => {
                    self.storage.remove(&(address, key));
                }
            },
        }
    }

    fn close_checkpoint(&mut self) {
        if self.checkpoints.is_empty() {
            self.journal.clear();
            self.originals.clear();
        }
    }
}

fn code_hash_of(code: &Bytes) -> Hash {
    if code.is_empty() {
        EMPTY_CODE_HASH
    } else {
        keccak256(code.as_slice())
    }
}

impl Repository for InMemoryRepository {
    fn get_balance(&self, address: Address) -> Result<U256, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.balance)
            .unwrap_or_default())
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let current = self.get_balance(address)?;
        let updated = current
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow(address))?;
        self.account_mut(address).balance = updated;
        Ok(())
    }

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let current = self.get_balance(address)?;
        let updated = current
            .checked_sub(amount)
            .ok_or(StateError::InsufficientBalance(address))?;
        self.account_mut(address).balance = updated;
        Ok(())
    }

    fn get_nonce(&self, address: Address) -> Result<u64, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.nonce)
            .unwrap_or_default())
    }

    fn increase_nonce(&mut self, address: Address) -> Result<u64, StateError> {
        let account = self.account_mut(address);
        let previous = account.nonce;
        account.nonce = previous.wrapping_add(1);
        Ok(previous)
    }

    fn get_code(&self, address: Address) -> Result<Bytes, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default())
    }

    fn save_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        if !self.accounts.contains_key(&address) {
            return Err(StateError::NotFound(address));
        }
        let account = self.account_mut(address);
        account.code_hash = code_hash_of(&code);
        account.code = code;
        Ok(())
    }

    fn get_code_hash(&self, address: Address) -> Result<Hash, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .map_or(Hash::ZERO, |account| account.code_hash))
    }

    fn get_storage_value(&self, address: Address, key: Word) -> Result<Word, StateError> {
        Ok(self
            .storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default())
    }

    fn add_storage_row(&mut self, address: Address, key: Word, value: Word) -> Result<(), StateError> {
        self.write_slot(address, key, value);
        Ok(())
    }

    fn get_original_storage_value(&self, address: Address, key: Word) -> Result<Word, StateError> {
        match self.originals.get(&(address, key)) {
            Some(value) => Ok(*value),
            None => self.get_storage_value(address, key),
        }
    }

    fn create_account(&mut self, address: Address) -> Result<(), StateError> {
        let balance = self.get_balance(address)?;
        self.clear_storage(address);
        *self.account_mut(address) = AccountInfo {
            balance,
            ..AccountInfo::default()
        };
        Ok(())
    }

    fn is_exist(&self, address: Address) -> Result<bool, StateError> {
        Ok(self.accounts.contains_key(&address))
    }

    fn is_empty(&self, address: Address) -> Result<bool, StateError> {
        Ok(self.accounts.get(&address).map_or(true, |account| {
            account.nonce == 0 && account.balance.is_zero() && account.code.is_empty()
        }))
    }

    fn delete(&mut self, address: Address) -> Result<(), StateError> {
        self.clear_storage(address);
        self.record_account(address);
        self.accounts.remove(&address);
        Ok(())
    }

    fn start_tracking(&mut self) {
        self.checkpoints.push(self.journal.len());
    }

    fn commit(&mut self) -> Result<(), StateError> {
        self.checkpoints.pop().ok_or(StateError::NoCheckpoint)?;
        self.close_checkpoint();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StateError> {
        let mark = self.checkpoints.pop().ok_or(StateError::NoCheckpoint)?;
        while self.journal.len() > mark {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.close_checkpoint();
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
