//! shipyard-deploy - Deploy and verify smart contracts.
//!
//! This crate deploys an ordered list of compiled contracts to an EVM network,
//! waits for each deployment to be mined, then registers every deployed
//! contract's source with a block explorer and aggregates the outcome in a
//! [`RunReport`].
//!
//! The orchestration core ([`sequencer`], [`coordinator`], [`Orchestrator`])
//! only talks to the traits in [`traits`]; [`services`] provides the
//! production implementations.

pub mod artifacts;
pub mod config;
pub mod coordinator;
pub mod errors;
mod orchestrator;
mod report;
pub mod rpc;
pub mod sequencer;
pub mod services;
pub mod traits;
mod types;

pub use artifacts::{Artifact, ArtifactError, ArtifactStore, BuildInfo};
pub use config::{Config, ConfigOverrides};
pub use coordinator::VerificationSettings;
pub use errors::{
    BroadcastError, ConfigurationError, ConfirmationError, DeployError, VerificationError,
};
pub use orchestrator::{Orchestrator, validate_specs};
pub use report::RunReport;
pub use traits::{
    Broadcaster, Clock, Confirmation, PendingTransaction, ProgressEvent, Reporter, TokioClock,
    TracingReporter, Verifier,
};
pub use types::{
    ContractSpec, DeploymentResult, DeploymentStatus, VerificationOutcome, VerificationStatus,
};
