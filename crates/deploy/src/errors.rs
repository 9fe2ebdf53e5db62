//! Error taxonomy for a deployment run.
//!
//! Deployment errors are recorded on the failing [`crate::DeploymentResult`],
//! verification errors are recovered into a [`crate::VerificationOutcome`], and
//! configuration errors abort the run before anything is broadcast.

use std::time::Duration;

use alloy_core::primitives::TxHash;
use thiserror::Error;

/// The deployment transaction could not be submitted.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("no compiled artifact named `{0}`")]
    UnknownArtifact(String),
    #[error("invalid artifact: {0}")]
    Artifact(String),
    #[error("failed to encode constructor arguments: {0}")]
    Encoding(String),
    #[error("failed to sign deployment transaction: {0}")]
    Signing(String),
    #[error("node rejected deployment transaction: {0}")]
    Rejected(String),
}

/// The transaction was submitted but never produced a usable contract address.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("broadcast succeeded but returned no transaction handle")]
    MissingHandle,
    #[error("transaction {0} was not finalized")]
    NotFinalized(TxHash),
    #[error("transaction {0} was mined without a contract address")]
    MissingContractAddress(TxHash),
    #[error("transaction {tx} not confirmed after {}s", .after.as_secs())]
    Timeout { tx: TxHash, after: Duration },
    #[error("failed to fetch receipt for {tx}: {reason}")]
    Receipt { tx: TxHash, reason: String },
}

/// Terminal cause of a failed deployment.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DeployError {
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
}

/// Source verification did not succeed for one contract.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum VerificationError {
    /// The explorer already holds verified source for this address.
    #[error("contract source code already verified")]
    AlreadyVerified,
    #[error("verification rejected: {0}")]
    Rejected(String),
    #[error("cannot build verification request: {0}")]
    Artifact(String),
    #[error("verifier request failed: {0}")]
    Transport(String),
    #[error("verification timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Required external configuration is missing or inconsistent.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing required configuration `{0}`")]
    Missing(&'static str),
    #[error("invalid configuration `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("contract `{0}` is listed more than once")]
    DuplicateContract(String),
    #[error("contract entry {0} has an empty name")]
    EmptyContractName(usize),
    #[error("no deployer account available: {0}")]
    NoSigner(String),
    #[error("failed to load configuration: {0}")]
    Load(String),
}
