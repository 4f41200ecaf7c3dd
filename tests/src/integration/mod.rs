//! # Integration Flows
//!
//! Transactions driven through the public `Evm` API against the in-memory
//! repository, checking state and gas at the end of each flow.

pub mod frames;
pub mod precompiles;
