//! # Fork Rules
//!
//! Protocol-version data consumed by the interpreter. Every dynamic gas constant
//! and every behavioural switch that changed across upgrades lives here, so the
//! engine itself carries no hardcoded snapshot of one historical version.
//!
//! | Fork | Notable changes |
//! |------|-----------------|
//! | Frontier | baseline |
//! | Homestead | DELEGATECALL, failing code-deposit OOG, 53000 create tx |
//! | TangerineWhistle | EIP-150 repricing, all-but-1/64 call gas |
//! | SpuriousDragon | EIP-161 nonce 1 / empty accounts, EIP-170 code size, EXP byte 50 |
//! | Byzantium | REVERT, RETURNDATA*, STATICCALL, MODEXP |
//! | Constantinople | shifts, CREATE2, EXTCODEHASH, EIP-1283 |
//! | Petersburg | EIP-1283 removed |
//! | Istanbul | CHAINID, SELFBALANCE, EIP-2200, EIP-1884, EIP-2028 |

use crate::errors::VmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// FORK
// =============================================================================

/// Protocol upgrade, ordered by activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Fork {
    /// Launch rules.
    Frontier,
    /// Homestead.
    Homestead,
    /// Tangerine Whistle (EIP-150).
    TangerineWhistle,
    /// Spurious Dragon (EIP-155/160/161/170).
    SpuriousDragon,
    /// Byzantium.
    Byzantium,
    /// Constantinople.
    Constantinople,
    /// Petersburg.
    Petersburg,
    /// Istanbul.
    #[default]
    Istanbul,
}

impl Fork {
    /// All forks in activation order.
    pub const ALL: [Fork; 8] = [
        Fork::Frontier,
        Fork::Homestead,
        Fork::TangerineWhistle,
        Fork::SpuriousDragon,
        Fork::Byzantium,
        Fork::Constantinople,
        Fork::Petersburg,
        Fork::Istanbul,
    ];
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Fork {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_', ' '], "").to_lowercase();
        Fork::ALL
            .into_iter()
            .find(|fork| fork.to_string().to_lowercase() == wanted)
            .ok_or_else(|| VmError::Config(format!("unknown fork: {s}")))
    }
}

// =============================================================================
// SSTORE METERING
// =============================================================================

/// SSTORE pricing model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SstoreMetering {
    /// Set / reset / clear-refund by current value only.
    Legacy,
    /// EIP-1283 net metering against the original value.
    Net,
    /// EIP-2200 net metering with the stipend sentry.
    NetWithSentry,
}

// =============================================================================
// GAS SCHEDULE
// =============================================================================

/// Fixed gas tiers shared by every fork.
pub mod costs {
    /// Zero tier.
    pub const ZERO: u64 = 0;
    /// Base tier (e.g., `ADDRESS`).
    pub const BASE: u64 = 2;
    /// Very low tier (e.g., `ADD`).
    pub const VERY_LOW: u64 = 3;
    /// Low tier (e.g., `MUL`).
    pub const LOW: u64 = 5;
    /// Mid tier (e.g., `JUMP`).
    pub const MID: u64 = 8;
    /// High tier (e.g., `JUMPI`).
    pub const HIGH: u64 = 10;
    /// Extended tier (`EXP` base).
    pub const EXP: u64 = 10;
    /// `JUMPDEST`.
    pub const JUMPDEST: u64 = 1;
}

/// Fork-dependent gas prices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// `BALANCE`.
    pub balance: u64,
    /// `EXTCODESIZE` and `EXTCODECOPY` base.
    pub ext_code: u64,
    /// `EXTCODEHASH`.
    pub ext_code_hash: u64,
    /// `SLOAD`.
    pub sload: u64,
    /// CALL-family base.
    pub call: u64,
    /// Surcharge for a value-carrying call.
    pub call_value: u64,
    /// Surcharge for calling into a new account.
    pub call_new_account: u64,
    /// Free gas handed to the callee of a value-carrying call.
    pub call_stipend: u64,
    /// Forwarding cap divisor (callee gets at most `gas - gas / divisor`).
    pub call_gas_divisor: u64,
    /// `SELFDESTRUCT` base.
    pub selfdestruct: u64,
    /// `SELFDESTRUCT` beneficiary creation surcharge.
    pub selfdestruct_new_account: u64,
    /// Refund for the first `SELFDESTRUCT` of an account.
    pub selfdestruct_refund: u64,
    /// `EXP` per exponent byte.
    pub exp_byte: u64,
    /// Memory cost per word (linear term).
    pub memory_word: u64,
    /// Memory quadratic term divisor.
    pub memory_quad_divisor: u64,
    /// Per word copied by `*COPY`.
    pub copy_word: u64,
    /// `SHA3` base.
    pub sha3: u64,
    /// `SHA3` per word hashed (also `CREATE2` init-code hashing).
    pub sha3_word: u64,
    /// `LOG` base.
    pub log: u64,
    /// `LOG` per topic.
    pub log_topic: u64,
    /// `LOG` per data byte.
    pub log_data: u64,
    /// `CREATE`/`CREATE2` base.
    pub create: u64,
    /// Per byte of deployed code.
    pub code_deposit_byte: u64,
    /// `SSTORE` zero to non-zero.
    pub sstore_set: u64,
    /// `SSTORE` non-zero to anything else.
    pub sstore_reset: u64,
    /// Refund for clearing a slot.
    pub sstore_clear_refund: u64,
    /// Net metering: write that does not change the current value or a dirty slot.
    pub sstore_noop: u64,
    /// Net metering with sentry: minimum gas left for any `SSTORE`.
    pub sstore_sentry: u64,
    /// `BLOCKHASH`.
    pub blockhash: u64,
    /// Intrinsic cost of a message call transaction.
    pub tx: u64,
    /// Intrinsic cost of a contract-creation transaction.
    pub tx_create: u64,
    /// Intrinsic cost per zero calldata byte.
    pub tx_data_zero: u64,
    /// Intrinsic cost per non-zero calldata byte.
    pub tx_data_non_zero: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self::for_fork(Fork::default())
    }
}

impl GasSchedule {
    /// Canonical prices for `fork`.
    #[must_use]
    pub fn for_fork(fork: Fork) -> Self {
        let eip150 = fork >= Fork::TangerineWhistle;
        let istanbul = fork >= Fork::Istanbul;
        Self {
            balance: match fork {
                f if f >= Fork::Istanbul => 700,
                f if f >= Fork::TangerineWhistle => 400,
                _ => 20,
            },
            ext_code: if eip150 { 700 } else { 20 },
            ext_code_hash: if istanbul { 700 } else { 400 },
            sload: match fork {
                f if f >= Fork::Istanbul => 800,
                f if f >= Fork::TangerineWhistle => 200,
                _ => 50,
            },
            call: if eip150 { 700 } else { 40 },
            call_value: 9000,
            call_new_account: 25_000,
            call_stipend: 2300,
            call_gas_divisor: 64,
            selfdestruct: if eip150 { 5000 } else { 0 },
            selfdestruct_new_account: if eip150 { 25_000 } else { 0 },
            selfdestruct_refund: 24_000,
            exp_byte: if fork >= Fork::SpuriousDragon { 50 } else { 10 },
            memory_word: 3,
            memory_quad_divisor: 512,
            copy_word: 3,
            sha3: 30,
            sha3_word: 6,
            log: 375,
            log_topic: 375,
            log_data: 8,
            create: 32_000,
            code_deposit_byte: 200,
            sstore_set: 20_000,
            sstore_reset: 5000,
            sstore_clear_refund: 15_000,
            sstore_noop: if istanbul { 800 } else { 200 },
            sstore_sentry: 2300,
            blockhash: 20,
            tx: 21_000,
            tx_create: if fork >= Fork::Homestead { 53_000 } else { 21_000 },
            tx_data_zero: 4,
            tx_data_non_zero: if istanbul { 16 } else { 68 },
        }
    }
}

// =============================================================================
// FORK RULES
// =============================================================================

/// Everything the interpreter needs to know about the active protocol version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkRules {
    /// Fork the rules were derived from; drives opcode availability.
    pub fork: Fork,
    /// Gas prices.
    pub gas: GasSchedule,
    /// Maximum nesting of frames.
    pub max_call_depth: usize,
    /// Cap forwarded call gas at all-but-1/divisor (EIP-150).
    pub limit_call_gas: bool,
    /// Maximum deployed code size (EIP-170).
    pub max_code_size: Option<usize>,
    /// Nonce given to freshly created contracts (EIP-161).
    pub create_nonce: u64,
    /// Treat empty accounts as non-existent for surcharges (EIP-161).
    pub empty_account_semantics: bool,
    /// Code-deposit OOG fails the creation instead of leaving empty code.
    pub fail_create_on_deposit_oog: bool,
    /// SSTORE pricing model.
    pub sstore_metering: SstoreMetering,
    /// Highest active precompile address.
    pub precompile_count: u8,
}

impl Default for ForkRules {
    fn default() -> Self {
        Self::for_fork(Fork::default())
    }
}

impl ForkRules {
    /// Canonical rules for `fork`.
    #[must_use]
    pub fn for_fork(fork: Fork) -> Self {
        Self {
            fork,
            gas: GasSchedule::for_fork(fork),
            max_call_depth: 1024,
            limit_call_gas: fork >= Fork::TangerineWhistle,
            max_code_size: (fork >= Fork::SpuriousDragon).then_some(24_576),
            create_nonce: u64::from(fork >= Fork::SpuriousDragon),
            empty_account_semantics: fork >= Fork::SpuriousDragon,
            fail_create_on_deposit_oog: fork >= Fork::Homestead,
            sstore_metering: match fork {
                Fork::Constantinople => SstoreMetering::Net,
                Fork::Istanbul => SstoreMetering::NetWithSentry,
                _ => SstoreMetering::Legacy,
            },
            precompile_count: if fork >= Fork::Byzantium { 5 } else { 4 },
        }
    }

    /// Parses a JSON document of rules. Missing fields take the defaults of the
    /// fork named in the document (or the default fork).
    ///
    /// # Errors
    ///
    /// Returns `Config` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, VmError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| VmError::Config(e.to_string()))?;
        let fork = match value.get("fork") {
            Some(fork) => serde_json::from_value::<Fork>(fork.clone())
                .map_err(|e| VmError::Config(e.to_string()))?,
            None => Fork::default(),
        };

        let mut base = serde_json::to_value(Self::for_fork(fork))
            .map_err(|e| VmError::Config(e.to_string()))?;
        merge_json(&mut base, value);
        serde_json::from_value(base).map_err(|e| VmError::Config(e.to_string()))
    }

    /// Returns true if `fork` is active under these rules.
    #[must_use]
    pub fn is_active(&self, fork: Fork) -> bool {
        self.fork >= fork
    }
}

fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// =============================================================================
// TESTS
// =============================================================================
