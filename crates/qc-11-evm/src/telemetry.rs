//! # Tracing Setup
//!
//! Installs a `tracing-subscriber` fmt layer for hosts that embed the engine
//! without their own subscriber. Opcode-level events are emitted at `trace`,
//! frame entry and exit at `debug`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::EvmConfig;
use crate::errors::VmError;

/// Installs the global subscriber. `RUST_LOG` wins over `config.log_level`.
///
/// Calling it again after a subscriber is installed is a no-op.
///
/// # Errors
///
/// Returns `Config` if the log level is not a valid filter directive.
pub fn init_tracing(config: &EvmConfig) -> Result<(), VmError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| VmError::Config(e.to_string()))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    // Err means a subscriber already exists.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
    Ok(())
}
