//! Signing and broadcast collaborator used by the deployment sequencer.

use std::future::Future;

use alloy_core::primitives::{Address, TxHash};
use serde_json::Value;

use crate::errors::{BroadcastError, ConfigurationError, ConfirmationError};

/// Handle to a submitted deployment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
}

/// What the network reported once a pending transaction was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Confirmation {
    /// Whether the transaction was included in a block and succeeded.
    pub finalized: bool,
    /// Address of the created contract, if any.
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
}

/// Signs, submits and tracks contract-creation transactions.
///
/// Implementations own signing, nonce selection and any network-level retry.
/// The sequencer calls [`Broadcaster::broadcast`] and [`Broadcaster::wait`]
/// exactly once per contract.
pub trait Broadcaster: Send + Sync {
    /// The account deployments are sent from.
    ///
    /// Failing here means no signer is usable and the run must not start.
    fn deployer(&self) -> impl Future<Output = Result<Address, ConfigurationError>> + Send;

    /// Build, sign and submit the creation transaction for `contract`.
    ///
    /// `Ok(None)` means the submission was accepted but no transaction handle
    /// came back.
    fn broadcast(
        &self,
        contract: &str,
        constructor_arguments: &[Value],
    ) -> impl Future<Output = Result<Option<PendingTransaction>, BroadcastError>> + Send;

    /// Suspend until the transaction is included in a block.
    fn wait(
        &self,
        pending: &PendingTransaction,
    ) -> impl Future<Output = Result<Confirmation, ConfirmationError>> + Send;
}
