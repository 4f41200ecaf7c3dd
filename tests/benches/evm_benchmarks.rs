//! # QC-11 EVM Benchmarks
//!
//! | Area | Claim | Target |
//! |------|-------|--------|
//! | Interpreter loop | Table dispatch, no per-opcode allocation | > 10M opcodes/s |
//! | Nested frames | 1024-deep CALL chain on an explicit frame stack | < 50ms |
//! | Precompiles | Linear in input size | < 1µs per 32 bytes |
//! | Batch simulation | Scales with cores | > 0.7x linear |

use criterion::{criterion_group, criterion_main};
use qc_tests::benchmarks::qc_11_evm::{
    brutal_arithmetic_loop, brutal_batch_simulation, brutal_call_depth, brutal_keccak_memory,
    brutal_precompiles,
};

criterion_group!(
    evm_benches,
    brutal_arithmetic_loop,
    brutal_keccak_memory,
    brutal_call_depth,
    brutal_precompiles,
    brutal_batch_simulation,
);
criterion_main!(evm_benches);
