//! Verification coordinator.
//!
//! Every deployment result yields exactly one [`VerificationOutcome`], in
//! deployment order. Failed deployments are skipped without a verifier call.
//! Each verifier call is turned into an outcome on its own, so one contract's
//! failure never affects another's verification.

use std::time::Duration;

use futures::{StreamExt, stream};

use crate::{
    errors::VerificationError,
    traits::{Clock, ProgressEvent, Reporter, Verifier},
    types::{DeploymentResult, VerificationOutcome},
};

/// Default time given to the explorer's indexer after the last deployment.
pub const DEFAULT_SETTLING_DELAY: Duration = Duration::from_secs(30);

/// Tuning of the verification phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSettings {
    /// Slept once before the first verifier call.
    pub settling_delay: Duration,
    /// Upper bound for a single verifier call.
    pub timeout: Option<Duration>,
    /// Maximum number of verifier calls in flight.
    pub concurrency: usize,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            settling_delay: DEFAULT_SETTLING_DELAY,
            timeout: None,
            concurrency: 1,
        }
    }
}

/// Verify every finalized deployment in `results`.
pub async fn verify<V, C, R>(
    results: &[DeploymentResult],
    settings: &VerificationSettings,
    verifier: &V,
    clock: &C,
    reporter: &R,
) -> Vec<VerificationOutcome>
where
    V: Verifier,
    C: Clock,
    R: Reporter,
{
    for result in results.iter().filter(|r| !r.is_finalized()) {
        reporter.report(&ProgressEvent::VerificationSkipped {
            contract: result.name().to_string(),
        });
    }

    if results.iter().any(DeploymentResult::is_finalized) {
        reporter.report(&ProgressEvent::SettlingDelay {
            delay: settings.settling_delay,
        });
        clock.sleep(settings.settling_delay).await;
    }

    stream::iter(results)
        .map(|result| verify_one(result, settings, verifier, reporter))
        .buffered(settings.concurrency.max(1))
        .collect()
        .await
}

async fn verify_one<V, R>(
    result: &DeploymentResult,
    settings: &VerificationSettings,
    verifier: &V,
    reporter: &R,
) -> VerificationOutcome
where
    V: Verifier,
    R: Reporter,
{
    let Some(address) = result.address() else {
        return VerificationOutcome::skipped(result);
    };

    reporter.report(&ProgressEvent::VerificationStarted {
        contract: result.name().to_string(),
        address,
    });

    let call = verifier.verify(result.name(), address, &result.spec().constructor_arguments);
    let attempt = match settings.timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(VerificationError::Timeout(limit))),
        None => call.await,
    };

    let outcome = outcome_from_attempt(result.name(), address, attempt.clone());
    let contract = result.name().to_string();
    match attempt {
        Ok(()) => reporter.report(&ProgressEvent::Verified { contract, address }),
        Err(VerificationError::AlreadyVerified) => {
            reporter.report(&ProgressEvent::AlreadyVerified { contract, address })
        }
        Err(err) => reporter.report(&ProgressEvent::VerificationFailed {
            contract,
            detail: err.to_string(),
        }),
    }

    outcome
}

/// Convert one verifier answer into an outcome.
///
/// An explorer that already holds the source counts as verified.
fn outcome_from_attempt(
    contract: &str,
    address: alloy_core::primitives::Address,
    attempt: Result<(), VerificationError>,
) -> VerificationOutcome {
    match attempt {
        Ok(()) | Err(VerificationError::AlreadyVerified) => {
            VerificationOutcome::verified(contract, address)
        }
        Err(err) => VerificationOutcome::failed(contract, address, err.to_string()),
    }
}
