//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the driven ports:
//! - `InMemoryRepository` for account/storage state
//! - `InMemoryBlockHashes` for BLOCKHASH
//! - `K256Verifier` for ecrecover

pub mod block_hash_adapter;
pub mod signature_adapter;
pub mod state_adapter;

pub use block_hash_adapter::*;
pub use signature_adapter::*;
pub use state_adapter::*;
