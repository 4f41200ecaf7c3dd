//! # Transaction Executor
//!
//! `Evm` runs whole messages: intrinsic gas, sender nonce, the root frame,
//! SELFDESTRUCT deletions and the refund cap. Everything below the root frame
//! belongs to the interpreter and the call manager.
//!
//! ## Checkpoints
//!
//! ```text
//! transact:  start_tracking ─ nonce++ ─ root frame ─ deletions ─ commit
//! call:      start_tracking ─ nonce++ ─ root frame ─ deletions ─ rollback
//! ```
//!
//! The root frame opens its own checkpoint inside the outer one, so a failed
//! frame rolls back to just after the nonce bump.
//!
//! ## Parallel simulation
//!
//! [`Evm::simulate_batch`] runs independent messages on cloned repositories
//! across a rayon pool. It is for estimation and mempool screening only:
//! committed execution stays sequential.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::adapters::block_hash_adapter::InMemoryBlockHashes;
use crate::config::EvmConfig;
use crate::domain::entities::{BlockContext, CallKind, CallResult, Message};
use crate::domain::fork::ForkRules;
use crate::domain::services::{compute_contract_address, intrinsic_gas};
use crate::errors::VmError;
use crate::evm::call_manager::{
    enter_create, prepare_call, Frame, Prepared, ReturnTarget, TxContext,
};
use crate::evm::gas::capped_refund;
use crate::evm::host::{CallRequest, CreateRequest, Host};
use crate::evm::interpreter::{InterruptHandle, Interpreter};
use crate::evm::precompiles::PrecompileRegistry;
use crate::evm::table::OpcodeTable;
use crate::ports::inbound::ExecutionApi;
use crate::ports::outbound::{BlockHashes, Repository, SignatureVerifier};
use crate::telemetry::init_tracing;

/// The execution engine for one set of fork rules.
pub struct Evm {
    rules: ForkRules,
    table: OpcodeTable,
    precompiles: PrecompileRegistry,
    block_hashes: Arc<dyn BlockHashes>,
    interrupt: InterruptHandle,
    pool: Option<rayon::ThreadPool>,
}

impl Evm {
    /// Builds an engine from runtime configuration and installs the log
    /// subscriber unless the host already has one.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the log level or the rule overlay is invalid, or the
    /// simulation pool cannot be created.
    pub fn new(config: &EvmConfig) -> Result<Self, VmError> {
        init_tracing(config)?;
        let mut evm = Self::with_rules(config.rules()?);
        if config.sim_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.sim_threads)
                .build()
                .map_err(|e| VmError::Config(e.to_string()))?;
            evm.pool = Some(pool);
        }
        info!(fork = %evm.rules.fork, sim_threads = config.sim_threads, "evm configured");
        Ok(evm)
    }

    /// Builds an engine for `rules` with the default collaborators: no known
    /// block hashes and the k256 signature verifier.
    #[must_use]
    pub fn with_rules(rules: ForkRules) -> Self {
        Self {
            table: OpcodeTable::for_rules(&rules),
            precompiles: PrecompileRegistry::for_rules(&rules),
            rules,
            block_hashes: Arc::new(InMemoryBlockHashes::new()),
            interrupt: InterruptHandle::new(),
            pool: None,
        }
    }

    /// Replaces the BLOCKHASH oracle.
    #[must_use]
    pub fn with_block_hashes(mut self, block_hashes: Arc<dyn BlockHashes>) -> Self {
        self.block_hashes = block_hashes;
        self
    }

    /// Replaces the ECRECOVER backend.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.precompiles = PrecompileRegistry::with_verifier(&self.rules, verifier);
        self
    }

    /// Shares `interrupt` with the caller instead of a private flag.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Active fork rules.
    #[must_use]
    pub fn rules(&self) -> &ForkRules {
        &self.rules
    }

    /// Handle that stops running executions at the next opcode.
    ///
    /// The flag is sticky: once set, every later execution on this engine
    /// halts at its first opcode with `OutOfGas` until
    /// [`InterruptHandle::reset`] is called.
    #[must_use]
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Executes `message` and keeps its state effects.
    ///
    /// # Errors
    ///
    /// `IntrinsicGas` if the gas limit does not cover the intrinsic cost,
    /// otherwise only fatal repository failures.
    #[instrument(skip(self, repo, block, message), fields(caller = ?message.caller, to = ?message.to, gas = message.gas_limit))]
    pub fn transact(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<CallResult, VmError> {
        let intrinsic = self.check_intrinsic(message)?;
        repo.start_tracking();
        match self.execute(repo, block, message, intrinsic) {
            Ok(result) => {
                repo.commit()?;
                info!(
                    success = result.success,
                    gas_used = result.gas_used,
                    logs = result.logs.len(),
                    "transaction executed"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(%err, "transaction aborted");
                repo.rollback()?;
                Err(err)
            }
        }
    }

    /// Executes `message` and discards every state effect.
    ///
    /// # Errors
    ///
    /// Same as [`Evm::transact`].
    #[instrument(skip(self, repo, block, message), fields(caller = ?message.caller, to = ?message.to, gas = message.gas_limit))]
    pub fn call(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<CallResult, VmError> {
        let intrinsic = self.check_intrinsic(message)?;
        repo.start_tracking();
        let result = self.execute(repo, block, message, intrinsic);
        repo.rollback()?;
        result
    }

    /// Binary-searches the smallest gas limit under which `message` succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`Evm::transact`].
    #[instrument(skip(self, repo, block, message), fields(caller = ?message.caller, cap = message.gas_limit))]
    pub fn estimate_gas(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<Option<u64>, VmError> {
        let intrinsic = self.check_intrinsic(message)?;
        if !self.call(repo, block, message)?.success {
            return Ok(None);
        }

        let mut probe = message.clone();
        let mut failing = intrinsic.saturating_sub(1);
        let mut passing = message.gas_limit;
        while passing - failing > 1 {
            let mid = failing + (passing - failing) / 2;
            probe.gas_limit = mid;
            if self.call(repo, block, &probe)?.success {
                passing = mid;
            } else {
                failing = mid;
            }
        }
        debug!(estimate = passing, "gas estimated");
        Ok(Some(passing))
    }

    /// Runs independent `messages` in parallel, each against its own copy of
    /// `base`. Results are in message order; `base` is never modified.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub fn simulate_batch<R>(
        &self,
        base: &R,
        block: &BlockContext,
        messages: &[Message],
    ) -> Vec<Result<CallResult, VmError>>
    where
        R: Repository + Clone + Sync,
    {
        let run = || {
            messages
                .par_iter()
                .map(|message| {
                    let mut repo = base.clone();
                    self.transact(&mut repo, block, message)
                })
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn check_intrinsic(&self, message: &Message) -> Result<u64, VmError> {
        let required = intrinsic_gas(message.data.as_slice(), message.is_create(), &self.rules.gas);
        if message.gas_limit < required {
            return Err(VmError::IntrinsicGas {
                required,
                limit: message.gas_limit,
            });
        }
        Ok(required)
    }

    /// Runs the root frame inside an already open checkpoint.
    fn execute(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
        intrinsic: u64,
    ) -> Result<CallResult, VmError> {
        let nonce = repo.increase_nonce(message.caller)?;

        let gas = message.gas_limit - intrinsic;
        let tx = TxContext {
            origin: message.caller,
            gas_price: message.gas_price,
            block: block.clone(),
        };

        let mut result = {
            let mut host = Host {
                repo: &mut *repo,
                rules: &self.rules,
                block_hashes: &*self.block_hashes,
                precompiles: &self.precompiles,
            };

            let (prepared, target) = match message.to {
                Some(to) => {
                    let request = CallRequest {
                        kind: CallKind::Call,
                        gas,
                        caller: message.caller,
                        address: to,
                        code_address: to,
                        value: message.value,
                        transfers_value: !message.value.is_zero(),
                        input: message.data.clone(),
                        out_offset: 0,
                        out_len: 0,
                        is_static: false,
                    };
                    let target = ReturnTarget::Call {
                        out_offset: 0,
                        out_len: 0,
                    };
                    (prepare_call(&mut host, &tx, 0, request)?, target)
                }
                None => {
                    let address = compute_contract_address(message.caller, nonce);
                    let target = ReturnTarget::Create { address };
                    if host.repo.get_balance(message.caller)? < message.value {
                        debug!("insufficient balance for endowment");
                        (Prepared::Finished(CallResult::failure(gas, None)), target)
                    } else {
                        let request = CreateRequest {
                            kind: CallKind::Create,
                            gas,
                            creator: message.caller,
                            value: message.value,
                            init_code: message.data.clone(),
                            salt: None,
                        };
                        (enter_create(&mut host, &tx, 0, request, address)?, target)
                    }
                }
            };

            match prepared {
                Prepared::Finished(result) => result,
                Prepared::Enter(program) => Interpreter::new(host, &self.table)
                    .with_interrupt(self.interrupt.clone())
                    .run(Frame { program, target })?,
            }
        };

        let mut refund = 0;
        if result.success {
            let destroyed = i64::try_from(result.destroyed.len()).unwrap_or(i64::MAX);
            let selfdestruct_refund =
                i64::try_from(self.rules.gas.selfdestruct_refund).unwrap_or(i64::MAX);
            let counter = result
                .gas_refunded
                .saturating_add(selfdestruct_refund.saturating_mul(destroyed));
            for address in &result.destroyed {
                repo.delete(*address)?;
            }
            refund = capped_refund(message.gas_limit - result.gas_left, counter);
        }

        result.gas_left += refund;
        result.gas_used = message.gas_limit - result.gas_left;
        result.gas_refunded = i64::try_from(refund).unwrap_or(i64::MAX);
        Ok(result)
    }
}

impl Default for Evm {
    fn default() -> Self {
        Self::with_rules(ForkRules::default())
    }
}

impl std::fmt::Debug for Evm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evm")
            .field("fork", &self.rules.fork)
            .field("opcodes", &self.table.len())
            .field("precompiles", &self.precompiles.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ExecutionApi Implementation
// =============================================================================

impl ExecutionApi for Evm {
    fn transact(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<CallResult, VmError> {
        Evm::transact(self, repo, block, message)
    }

    fn call(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<CallResult, VmError> {
        Evm::call(self, repo, block, message)
    }

    fn estimate_gas(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<Option<u64>, VmError> {
        Evm::estimate_gas(self, repo, block, message)
    }
}

// =============================================================================
// TESTS
// =============================================================================
