//! Top-level driver: deploy, verify, report.

use std::{collections::HashSet, time::Duration};

use crate::{
    coordinator::{self, VerificationSettings},
    errors::ConfigurationError,
    report::RunReport,
    sequencer,
    traits::{Broadcaster, Clock, ProgressEvent, Reporter, TokioClock, TracingReporter, Verifier},
    types::ContractSpec,
};

/// Runs the deployment sequencer followed by the verification coordinator.
///
/// Each call to [`Orchestrator::run`] is independent: nothing is carried over
/// between runs besides the collaborators themselves.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use shipyard_deploy::{
///     ContractSpec, Orchestrator,
///     services::{EtherscanVerifier, NodeBroadcaster},
/// };
///
/// # async fn example(
/// #     broadcaster: NodeBroadcaster,
/// #     verifier: EtherscanVerifier,
/// # ) -> anyhow::Result<()> {
/// let report = Orchestrator::new(broadcaster, verifier)
///     .settling_delay(Duration::from_secs(30))
///     .run(&[ContractSpec::new("SimbiToken")])
///     .await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator<B, V, C = TokioClock, R = TracingReporter> {
    broadcaster: B,
    verifier: V,
    clock: C,
    reporter: R,
    verification: VerificationSettings,
}

impl<B, V> Orchestrator<B, V>
where
    B: Broadcaster,
    V: Verifier,
{
    /// Create an orchestrator with a real timer and tracing output.
    pub fn new(broadcaster: B, verifier: V) -> Self {
        Self {
            broadcaster,
            verifier,
            clock: TokioClock,
            reporter: TracingReporter,
            verification: VerificationSettings::default(),
        }
    }
}

impl<B, V, C, R> Orchestrator<B, V, C, R> {
    /// Replace the delay source.
    pub fn clock<C2: Clock>(self, clock: C2) -> Orchestrator<B, V, C2, R> {
        Orchestrator {
            broadcaster: self.broadcaster,
            verifier: self.verifier,
            clock,
            reporter: self.reporter,
            verification: self.verification,
        }
    }

    /// Replace the progress sink.
    pub fn reporter<R2: Reporter>(self, reporter: R2) -> Orchestrator<B, V, C, R2> {
        Orchestrator {
            broadcaster: self.broadcaster,
            verifier: self.verifier,
            clock: self.clock,
            reporter,
            verification: self.verification,
        }
    }

    /// Set the wait between the last deployment and the first verification.
    pub fn settling_delay(mut self, delay: Duration) -> Self {
        self.verification.settling_delay = delay;
        self
    }

    /// Bound each verifier call.
    pub fn verification_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.verification.timeout = timeout;
        self
    }

    /// Allow up to `concurrency` verifier calls at once. `1` keeps them sequential.
    pub fn verification_concurrency(mut self, concurrency: usize) -> Self {
        self.verification.concurrency = concurrency.max(1);
        self
    }

    pub fn verification_settings(&self) -> &VerificationSettings {
        &self.verification
    }
}

impl<B, V, C, R> Orchestrator<B, V, C, R>
where
    B: Broadcaster,
    V: Verifier,
    C: Clock,
    R: Reporter,
{
    /// Deploy and verify `specs`.
    ///
    /// Only configuration problems detected before the first broadcast are
    /// returned as errors; deployment and verification failures are recorded
    /// in the report.
    pub async fn run(&self, specs: &[ContractSpec]) -> Result<RunReport, ConfigurationError> {
        validate_specs(specs)?;

        let deployer = self.broadcaster.deployer().await?;
        self.reporter
            .report(&ProgressEvent::DeployerResolved { deployer });

        tracing::info!(contracts = specs.len(), "Starting deployment process...");
        let deployments = sequencer::deploy(specs, &self.broadcaster, &self.reporter).await;

        let not_attempted: Vec<String> = specs[deployments.len()..]
            .iter()
            .map(|spec| spec.name.clone())
            .collect();

        let verifications = coordinator::verify(
            &deployments,
            &self.verification,
            &self.verifier,
            &self.clock,
            &self.reporter,
        )
        .await;

        let report = RunReport::new(deployer, deployments, verifications, not_attempted);
        tracing::info!(
            succeeded = report.succeeded(),
            deployed = report.addresses().len(),
            verification_failures = report.verification_failures().count(),
            "Deployment run complete"
        );

        Ok(report)
    }
}

/// Reject empty or repeated contract names before anything is broadcast.
pub fn validate_specs(specs: &[ContractSpec]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for (index, spec) in specs.iter().enumerate() {
        if spec.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyContractName(index));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(ConfigurationError::DuplicateContract(spec.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_specs() {
        assert!(validate_specs(&[]).is_ok());
        assert!(validate_specs(&[ContractSpec::new("A"), ContractSpec::new("B")]).is_ok());
        assert_eq!(
            validate_specs(&[ContractSpec::new("A"), ContractSpec::new("A")]),
            Err(ConfigurationError::DuplicateContract("A".to_string()))
        );
        assert_eq!(
            validate_specs(&[ContractSpec::new("A"), ContractSpec::new(" ")]),
            Err(ConfigurationError::EmptyContractName(1))
        );
    }
}
