//! Aggregate report of one orchestration run.

use std::{collections::BTreeMap, fmt, path::Path};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

use crate::types::{DeploymentResult, DeploymentStatus, VerificationOutcome, VerificationStatus};

/// Everything a run deployed and verified.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub deployer: Address,
    pub generated_at: DateTime<Utc>,
    /// Deployment results, in deployment order.
    pub deployments: Vec<DeploymentResult>,
    /// One outcome per deployment result, in the same order.
    pub verifications: Vec<VerificationOutcome>,
    /// Contracts never broadcast because an earlier deployment failed.
    pub not_attempted: Vec<String>,
}

impl RunReport {
    pub fn new(
        deployer: Address,
        deployments: Vec<DeploymentResult>,
        verifications: Vec<VerificationOutcome>,
        not_attempted: Vec<String>,
    ) -> Self {
        Self {
            deployer,
            generated_at: Utc::now(),
            deployments,
            verifications,
            not_attempted,
        }
    }

    /// Whether every requested contract was deployed.
    ///
    /// Verification outcomes do not participate.
    pub fn succeeded(&self) -> bool {
        compute_succeeded(&self.deployments, &self.not_attempted)
    }

    pub fn failed_deployments(&self) -> impl Iterator<Item = &DeploymentResult> {
        self.deployments.iter().filter(|d| !d.is_finalized())
    }

    pub fn verification_failures(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.verifications
            .iter()
            .filter(|v| v.status == VerificationStatus::VerificationFailed)
    }

    /// Contract name to address for every finalized deployment.
    pub fn addresses(&self) -> BTreeMap<String, Address> {
        self.deployments
            .iter()
            .filter_map(|d| d.address().map(|address| (d.name().to_string(), address)))
            .collect()
    }

    /// Write the report as pretty JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Run report saved");
        Ok(())
    }
}

fn compute_succeeded(deployments: &[DeploymentResult], not_attempted: &[String]) -> bool {
    not_attempted.is_empty()
        && deployments
            .iter()
            .all(|d| d.status() == DeploymentStatus::Finalized)
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.succeeded() { "SUCCESS" } else { "FAILED" };
        writeln!(f, "Deployment Status: {}", status)?;
        writeln!(f, "Deployer: {}", self.deployer)?;
        writeln!(f)?;

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Contract", "Deployment", "Address", "Verification"]);

        for (deployment, verification) in self.deployments.iter().zip(&self.verifications) {
            let address = match (deployment.address(), deployment.error()) {
                (Some(address), _) => address.to_string(),
                (None, Some(err)) => err.to_string(),
                (None, None) => "-".to_string(),
            };
            let verification = match &verification.detail {
                Some(detail) if verification.status == VerificationStatus::VerificationFailed => {
                    format!("{} ({})", verification.status, detail)
                }
                _ => verification.status.to_string(),
            };
            table.add_row(vec![
                deployment.name().to_string(),
                deployment.status().to_string(),
                address,
                verification,
            ]);
        }

        for name in &self.not_attempted {
            table.add_row(vec![name.as_str(), "NotAttempted", "-", "-"]);
        }

        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::TxHash;

    use super::*;
    use crate::{
        errors::{BroadcastError, VerificationError},
        types::ContractSpec,
    };

    fn finalized(name: &str, byte: u8) -> DeploymentResult {
        DeploymentResult::finalized(
            ContractSpec::new(name),
            TxHash::repeat_byte(byte),
            Address::repeat_byte(byte),
        )
    }

    fn failed(name: &str) -> DeploymentResult {
        DeploymentResult::failed(
            ContractSpec::new(name),
            None,
            BroadcastError::Rejected("insufficient funds".to_string()),
        )
    }

    #[test]
    fn test_verification_failures_do_not_fail_the_run() {
        let report = RunReport::new(
            Address::ZERO,
            vec![finalized("A", 1)],
            vec![VerificationOutcome::failed(
                "A",
                Address::repeat_byte(1),
                VerificationError::Rejected("mismatch".to_string()).to_string(),
            )],
            vec![],
        );

        assert!(report.succeeded());
        assert_eq!(report.verification_failures().count(), 1);
    }

    #[test]
    fn test_failed_deployment_fails_the_run() {
        let deployments = vec![finalized("A", 1), failed("B")];
        assert!(!compute_succeeded(&deployments, &[]));
        assert!(!compute_succeeded(&[finalized("A", 1)], &["B".to_string()]));
        assert!(compute_succeeded(&[], &[]));
    }

    #[test]
    fn test_addresses_only_lists_finalized() {
        let report = RunReport::new(
            Address::ZERO,
            vec![finalized("A", 1), failed("B")],
            vec![],
            vec![],
        );

        let addresses = report.addresses();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses["A"], Address::repeat_byte(1));
        assert_eq!(report.failed_deployments().count(), 1);
    }

    #[test]
    fn test_json_uses_camel_case_fields() {
        let deployment = failed("B");
        let skipped = VerificationOutcome::skipped(&deployment);
        let report = RunReport::new(
            Address::ZERO,
            vec![deployment],
            vec![skipped],
            vec!["C".to_string()],
        );

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("generatedAt").is_some());
        assert_eq!(json["notAttempted"], serde_json::json!(["C"]));
        assert_eq!(json["verifications"][0]["status"], "Skipped");
        assert!(json["deployments"][0].get("transactionHash").is_some());
    }

    #[test]
    fn test_summary_lists_every_contract() {
        let deployments = vec![finalized("TokenA", 1), failed("TokenB")];
        let verifications = vec![
            VerificationOutcome::verified("TokenA", Address::repeat_byte(1)),
            VerificationOutcome::skipped(&deployments[1]),
        ];
        let report = RunReport::new(
            Address::ZERO,
            deployments,
            verifications,
            vec!["TokenC".to_string()],
        );

        let summary = report.to_string();
        assert!(summary.starts_with("Deployment Status: FAILED"));
        assert!(summary.contains("TokenA"));
        assert!(summary.contains("TokenB"));
        assert!(summary.contains("TokenC"));
        assert!(summary.contains("NotAttempted"));
    }
}
