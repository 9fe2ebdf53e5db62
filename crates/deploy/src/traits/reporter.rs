//! Progress reporting sink.

use std::{fmt, time::Duration};

use alloy_core::primitives::{Address, TxHash};

/// A human-readable step of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    DeployerResolved {
        deployer: Address,
    },
    DeploymentStarted {
        index: usize,
        total: usize,
        contract: String,
    },
    DeploymentFinalized {
        contract: String,
        address: Address,
        transaction_hash: TxHash,
    },
    DeploymentFailed {
        contract: String,
        cause: String,
    },
    /// Remaining contracts were not broadcast after a failure.
    DeploymentsAborted {
        remaining: Vec<String>,
    },
    SettlingDelay {
        delay: Duration,
    },
    VerificationStarted {
        contract: String,
        address: Address,
    },
    Verified {
        contract: String,
        address: Address,
    },
    AlreadyVerified {
        contract: String,
        address: Address,
    },
    VerificationFailed {
        contract: String,
        detail: String,
    },
    VerificationSkipped {
        contract: String,
    },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeployerResolved { deployer } => {
                write!(f, "Deploying contracts with account: {deployer}")
            }
            Self::DeploymentStarted {
                index,
                total,
                contract,
            } => write!(f, "[{}/{}] Deploying {contract}...", index + 1, total),
            Self::DeploymentFinalized {
                contract, address, ..
            } => write!(f, "{contract} deployed to: {address}"),
            Self::DeploymentFailed { contract, cause } => {
                write!(f, "{contract} deployment failed: {cause}")
            }
            Self::DeploymentsAborted { remaining } => {
                write!(f, "Aborting, not deployed: {}", remaining.join(", "))
            }
            Self::SettlingDelay { delay } => write!(
                f,
                "Waiting {} seconds before verification...",
                delay.as_secs()
            ),
            Self::VerificationStarted { contract, address } => {
                write!(f, "Verifying {contract} at {address}...")
            }
            Self::Verified { contract, .. } => write!(f, "{contract} verified"),
            Self::AlreadyVerified { contract, .. } => write!(f, "{contract} already verified"),
            Self::VerificationFailed { contract, detail } => {
                write!(f, "{contract} verification failed: {detail}")
            }
            Self::VerificationSkipped { contract } => {
                write!(f, "{contract} verification skipped, deployment did not finalize")
            }
        }
    }
}

/// Receives progress events.
///
/// Reporting is fire-and-forget: implementations must not block and have no
/// way to fail the run.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Emits progress events as `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::DeployerResolved { deployer } => {
                tracing::info!(deployer = %deployer, "{event}");
            }
            ProgressEvent::DeploymentStarted { contract, .. } => {
                tracing::info!(contract = %contract, "{event}");
            }
            ProgressEvent::DeploymentFinalized {
                contract,
                address,
                transaction_hash,
            } => {
                tracing::info!(
                    contract = %contract,
                    address = %address,
                    tx_hash = %transaction_hash,
                    "{event}"
                );
            }
            ProgressEvent::DeploymentFailed { contract, .. } => {
                tracing::error!(contract = %contract, "{event}");
            }
            ProgressEvent::DeploymentsAborted { remaining } => {
                tracing::error!(remaining = remaining.len(), "{event}");
            }
            ProgressEvent::SettlingDelay { delay } => {
                tracing::info!(delay_secs = delay.as_secs(), "{event}");
            }
            ProgressEvent::VerificationStarted { contract, address }
            | ProgressEvent::Verified { contract, address }
            | ProgressEvent::AlreadyVerified { contract, address } => {
                tracing::info!(contract = %contract, address = %address, "{event}");
            }
            ProgressEvent::VerificationFailed { contract, .. } => {
                tracing::warn!(contract = %contract, "{event}");
            }
            ProgressEvent::VerificationSkipped { contract } => {
                tracing::warn!(contract = %contract, "{event}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_event_is_one_based() {
        let event = ProgressEvent::DeploymentStarted {
            index: 0,
            total: 2,
            contract: "StudyAchievements".to_string(),
        };
        assert_eq!(event.to_string(), "[1/2] Deploying StudyAchievements...");
    }

    #[test]
    fn test_settling_delay_message() {
        let event = ProgressEvent::SettlingDelay {
            delay: Duration::from_secs(30),
        };
        assert_eq!(
            event.to_string(),
            "Waiting 30 seconds before verification..."
        );
    }
}
