//! # QC-11 EVM Brutal Benchmarks
//!
//! Throughput targets:
//! - Tight arithmetic loop: millions of opcodes per second
//! - Nested CALL chain to the depth limit without native recursion
//! - KECCAK-heavy memory workloads
//! - Precompile dispatch overhead
//! - Parallel batch simulation scaling
//!
//! Brutal Conditions:
//! - Loops that run until the gas limit is exhausted
//! - 1024-deep frame stacks
//! - Large memory expansions per transaction

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use qc_11_evm::evm::Precompile;
use qc_11_evm::prelude::*;
use rand::Rng;
use std::time::Duration;

use crate::support::{call_to, repo_with};

fn contract() -> Address {
    Address::from_low_u64(0xC0DE)
}

/// Counts down from `iterations`: JUMPDEST, SUB 1, DUP1, JUMPI back.
fn countdown(iterations: u32) -> Vec<u8> {
    let mut code = vec![0x63];
    code.extend_from_slice(&iterations.to_be_bytes()); // PUSH4 n
    code.extend_from_slice(&[
        0x5B, // 5: JUMPDEST
        0x60, 0x01, 0x90, 0x03, // PUSH1 1 SWAP1 SUB
        0x80, 0x60, 0x05, 0x57, // DUP1 PUSH1 5 JUMPI
        0x00,
    ]);
    code
}

/// Hashes a growing memory window `rounds` times.
fn keccak_rounds(rounds: u8) -> Vec<u8> {
    let mut code = Vec::new();
    for round in 0..rounds {
        // KECCAK256(0, 32 * (round + 1)) stored back at 32 * round
        let len = 32u8.saturating_mul(round.saturating_add(1));
        code.extend_from_slice(&[0x60, len, 0x60, 0x00, 0x20]);
        code.extend_from_slice(&[0x60, 32u8.saturating_mul(round), 0x52]);
    }
    code.push(0x00);
    code
}

/// Calls itself with all remaining gas until the depth limit refuses.
fn recursive_caller() -> Vec<u8> {
    vec![
        0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out, in, value
        0x30, 0x5A, 0xF1, 0x00, // ADDRESS GAS CALL STOP
    ]
}

pub fn brutal_arithmetic_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11/brutal/arithmetic_loop");
    group.measurement_time(Duration::from_secs(10));
    let evm = Evm::default();
    let block = BlockContext::default();

    for iterations in [1_000u32, 10_000, 100_000] {
        let code = countdown(iterations);
        let repo = repo_with(&[(contract(), &code[..])]);
        let message = call_to(contract(), &[], 30_000_000);

        group.throughput(Throughput::Elements(u64::from(iterations) * 5));
        group.bench_with_input(
            BenchmarkId::new("countdown", iterations),
            &message,
            |b, message| {
                b.iter(|| {
                    let mut repo = repo.clone();
                    black_box(evm.transact(&mut repo, &block, message))
                })
            },
        );
    }

    group.finish();
}

pub fn brutal_keccak_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11/brutal/keccak_memory");
    let evm = Evm::default();
    let block = BlockContext::default();

    for rounds in [8u8, 64, 200] {
        let code = keccak_rounds(rounds);
        let repo = repo_with(&[(contract(), &code[..])]);
        let message = call_to(contract(), &[], 30_000_000);

        group.bench_with_input(BenchmarkId::new("rounds", rounds), &message, |b, message| {
            b.iter(|| {
                let mut repo = repo.clone();
                black_box(evm.transact(&mut repo, &block, message))
            })
        });
    }

    group.finish();
}

pub fn brutal_call_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11/brutal/call_depth");
    group.sample_size(20);
    let block = BlockContext::default();
    let code = recursive_caller();

    for depth in [16usize, 256, 1024] {
        let config = EvmConfig {
            rules_json: Some(format!(r#"{{"max_call_depth": {depth}}}"#)),
            ..EvmConfig::default()
        };
        let Ok(evm) = Evm::new(&config) else {
            continue;
        };
        let repo = repo_with(&[(contract(), &code[..])]);
        let message = call_to(contract(), &[], 30_000_000);

        group.bench_with_input(BenchmarkId::new("frames", depth), &message, |b, message| {
            b.iter(|| {
                let mut repo = repo.clone();
                black_box(evm.transact(&mut repo, &block, message))
            })
        });
    }

    group.finish();
}

pub fn brutal_precompiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11/brutal/precompiles");
    let registry = PrecompileRegistry::for_rules(&ForkRules::default());
    let mut rng = rand::thread_rng();

    for size in [32usize, 1024, 16 * 1024] {
        let input: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        group.throughput(Throughput::Bytes(size as u64));

        for index in 2u8..=4 {
            let mut bytes = [0u8; 20];
            bytes[19] = index;
            let Some(precompile) = registry.get(Address::new(bytes)) else {
                continue;
            };
            group.bench_with_input(
                BenchmarkId::new(format!("0x{index:02x}"), size),
                &input,
                |b, input| b.iter(|| black_box(precompile.execute(input, u64::MAX))),
            );
        }
    }

    group.finish();
}

pub fn brutal_batch_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-11/brutal/batch_simulation");
    group.sample_size(20);
    let evm = Evm::default();
    let block = BlockContext::default();
    let code = countdown(1_000);
    let repo = repo_with(&[(contract(), &code[..])]);

    for batch in [16usize, 128, 512] {
        let messages: Vec<Message> = (0..batch)
            .map(|_| call_to(contract(), &[], 1_000_000))
            .collect();

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("parallel", batch), &messages, |b, messages| {
            b.iter(|| black_box(evm.simulate_batch(&repo, &block, messages)))
        });
        group.bench_with_input(
            BenchmarkId::new("sequential", batch),
            &messages,
            |b, messages| {
                b.iter(|| {
                    messages
                        .iter()
                        .map(|message| {
                            let mut copy = repo.clone();
                            evm.transact(&mut copy, &block, message)
                        })
                        .collect::<Vec<_>>()
                })
            },
        );
    }

    group.finish();
}
