//! Data model of a deployment run.

use alloy_core::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::errors::DeployError;

/// Input descriptor for one contract to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSpec {
    /// Name of the compiled artifact, either `Name` or `path/File.sol:Name`.
    pub name: String,
    /// Ordered constructor arguments, coerced against the artifact's ABI.
    #[serde(default, alias = "constructor_arguments")]
    pub constructor_arguments: Vec<Value>,
}

impl ContractSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor_arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = Value>) -> Self {
        self.constructor_arguments = arguments.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum DeploymentStatus {
    Finalized,
    Failed,
}

/// Output of deploying one [`ContractSpec`].
///
/// Only [`DeploymentResult::finalized`] sets an address, so `address` is
/// present exactly when the status is [`DeploymentStatus::Finalized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    spec: ContractSpec,
    address: Option<Address>,
    transaction_hash: Option<TxHash>,
    status: DeploymentStatus,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    error: Option<DeployError>,
}

impl DeploymentResult {
    pub fn finalized(spec: ContractSpec, transaction_hash: TxHash, address: Address) -> Self {
        Self {
            spec,
            address: Some(address),
            transaction_hash: Some(transaction_hash),
            status: DeploymentStatus::Finalized,
            error: None,
        }
    }

    pub fn failed(
        spec: ContractSpec,
        transaction_hash: Option<TxHash>,
        error: impl Into<DeployError>,
    ) -> Self {
        Self {
            spec,
            address: None,
            transaction_hash,
            status: DeploymentStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn spec(&self) -> &ContractSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn transaction_hash(&self) -> Option<TxHash> {
        self.transaction_hash
    }

    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    pub fn error(&self) -> Option<&DeployError> {
        self.error.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.status == DeploymentStatus::Finalized
    }
}

fn serialize_error<S: Serializer>(error: &Option<DeployError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => s.collect_str(err),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum VerificationStatus {
    Verified,
    VerificationFailed,
    Skipped,
}

/// Outcome of attempting to verify one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub contract: String,
    pub address: Option<Address>,
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerificationOutcome {
    pub fn verified(contract: impl Into<String>, address: Address) -> Self {
        Self {
            contract: contract.into(),
            address: Some(address),
            status: VerificationStatus::Verified,
            detail: None,
        }
    }

    pub fn failed(
        contract: impl Into<String>,
        address: Address,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            contract: contract.into(),
            address: Some(address),
            status: VerificationStatus::VerificationFailed,
            detail: Some(detail.into()),
        }
    }

    /// Outcome for a deployment that never finalized.
    pub fn skipped(result: &DeploymentResult) -> Self {
        let cause = result
            .error()
            .map(|err| format!("deployment failed: {err}"))
            .unwrap_or_else(|| "deployment not finalized".to_string());

        Self {
            contract: result.name().to_string(),
            address: None,
            status: VerificationStatus::Skipped,
            detail: Some(cause),
        }
    }
}
