//! # QC-11 EVM Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Interpreter and precompile throughput
//! │   └── qc_11_evm.rs
//! │
//! └── integration/      # Whole-transaction flows through `Evm`
//!     ├── frames.rs     # Nested CALL/CREATE behaviour
//!     └── precompiles.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod benchmarks;
pub mod integration;
pub mod support;
