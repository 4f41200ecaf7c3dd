//! # Engine Configuration
//!
//! Runtime knobs for the executor, read from environment variables.

use std::env;

use tracing::warn;

use crate::domain::fork::{Fork, ForkRules};
use crate::errors::VmError;

/// Runtime configuration of an [`Evm`](crate::service::Evm).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmConfig {
    /// Protocol upgrade to execute under.
    pub fork: Fork,

    /// Optional JSON overlay on the fork's rules (gas schedule, limits).
    pub rules_json: Option<String>,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Worker threads for batch simulation. 0 uses the global rayon pool.
    pub sim_threads: usize,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            fork: Fork::default(),
            rules_json: None,
            log_level: "info".to_string(),
            sim_threads: 0,
        }
    }
}

impl EvmConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_EVM_FORK`: Fork name, e.g. `byzantium` (default: istanbul)
    /// - `QC_EVM_RULES_JSON`: JSON overrides for the fork rules
    /// - `QC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QC_EVM_SIM_THREADS`: Batch simulation threads (default: 0)
    ///
    /// # Errors
    ///
    /// Returns `Config` if `QC_EVM_FORK` names an unknown fork.
    pub fn from_env() -> Result<Self, VmError> {
        let fork = match env::var("QC_EVM_FORK") {
            Ok(name) => name.parse()?,
            Err(_) => Fork::default(),
        };

        let sim_threads = match env::var("QC_EVM_SIM_THREADS") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!(%value, "ignoring invalid QC_EVM_SIM_THREADS");
                0
            }),
            Err(_) => 0,
        };

        Ok(Self {
            fork,
            rules_json: env::var("QC_EVM_RULES_JSON").ok(),
            log_level: env::var("QC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            sim_threads,
        })
    }

    /// Resolves the fork rules: the canonical rules of `fork`, with
    /// `rules_json` laid over them when present. An overlay that names no fork
    /// applies to `fork`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the overlay is not a valid JSON object.
    pub fn rules(&self) -> Result<ForkRules, VmError> {
        let Some(json) = &self.rules_json else {
            return Ok(ForkRules::for_fork(self.fork));
        };

        let mut overlay: serde_json::Value =
            serde_json::from_str(json).map_err(|e| VmError::Config(e.to_string()))?;
        let Some(fields) = overlay.as_object_mut() else {
            return Err(VmError::Config("rule overrides must be a JSON object".to_string()));
        };
        if !fields.contains_key("fork") {
            let fork =
                serde_json::to_value(self.fork).map_err(|e| VmError::Config(e.to_string()))?;
            fields.insert("fork".to_string(), fork);
        }
        ForkRules::from_json(&overlay.to_string())
    }
}
