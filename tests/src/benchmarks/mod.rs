//! # QC-11 Benchmarks
//!
//! Throughput of the interpreter loop, nested frames and precompiles.

pub mod qc_11_evm;
