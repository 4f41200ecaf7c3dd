//! # Driving Ports (API - Inbound)
//!
//! The interface a transaction pipeline uses to run messages through the
//! engine. Receipts, fee payment and block assembly stay on the caller's side.

use crate::domain::entities::{BlockContext, CallResult, Message};
use crate::errors::VmError;
use crate::ports::outbound::Repository;

/// Message execution against a state collaborator.
pub trait ExecutionApi {
    /// Executes `message` and keeps its state effects (the sender's nonce
    /// bump persists even when the frame fails).
    ///
    /// # Errors
    ///
    /// `IntrinsicGas` if the gas limit does not cover the intrinsic cost,
    /// otherwise only fatal repository failures. EVM-level failures are
    /// reported in the returned [`CallResult`].
    fn transact(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<CallResult, VmError>;

    /// Executes `message` and discards every state effect.
    ///
    /// # Errors
    ///
    /// Same as [`ExecutionApi::transact`].
    fn call(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<CallResult, VmError>;

    /// Smallest gas limit (up to `message.gas_limit`) under which `message`
    /// succeeds, or `None` if it fails even with the full limit.
    ///
    /// # Errors
    ///
    /// Same as [`ExecutionApi::transact`].
    fn estimate_gas(
        &self,
        repo: &mut dyn Repository,
        block: &BlockContext,
        message: &Message,
    ) -> Result<Option<u64>, VmError>;
}
