//! Source verification through an Etherscan-compatible explorer API.

use std::time::Duration;

use alloy_core::primitives::Address;
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{
    artifacts::ArtifactStore,
    errors::VerificationError,
    rpc::create_client,
    traits::Verifier,
};

/// Etherscan's multichain endpoint.
pub const DEFAULT_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Default delay between verification status checks.
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of status checks before giving up on a pending submission.
pub const DEFAULT_MAX_STATUS_CHECKS: usize = 20;

const CODE_FORMAT: &str = "solidity-standard-json-input";

/// Settings for [`EtherscanVerifier`].
#[derive(Debug, Clone)]
pub struct EtherscanConfig {
    pub api_url: Url,
    pub api_key: String,
    pub chain_id: u64,
    pub poll_interval: Duration,
    pub max_status_checks: usize,
}

impl EtherscanConfig {
    pub fn new(api_url: Url, api_key: impl Into<String>, chain_id: u64) -> Self {
        Self {
            api_url,
            api_key: api_key.into(),
            chain_id,
            poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            max_status_checks: DEFAULT_MAX_STATUS_CHECKS,
        }
    }
}

/// Submits standard-JSON compiler input for deployed contracts.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    config: EtherscanConfig,
    artifacts: ArtifactStore,
}

/// Envelope shared by every explorer response.
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

impl EtherscanResponse {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }

    fn result_text(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            Value::Null => self.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Status check outcome that is worth retrying.
enum StatusCheck {
    Pending,
    Done(VerificationError),
}

impl EtherscanVerifier {
    pub fn new(config: EtherscanConfig, artifacts: ArtifactStore) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: create_client(Duration::from_secs(30))?,
            config,
            artifacts,
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<EtherscanResponse, VerificationError> {
        let chain_id = self.config.chain_id.to_string();
        self.client
            .get(self.config.api_url.clone())
            .query(&[("chainid", chain_id.as_str()), ("apikey", self.config.api_key.as_str())])
            .query(params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| VerificationError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))
    }

    /// Whether the explorer already shows source code for `address`.
    async fn is_verified(&self, address: Address) -> Result<bool, VerificationError> {
        let address = address.to_string();
        let response = self
            .get(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address.as_str()),
            ])
            .await?;

        Ok(response.is_ok()
            && response.result[0]["SourceCode"]
                .as_str()
                .is_some_and(|source| !source.is_empty()))
    }

    /// Submit the source and return the explorer's receipt GUID.
    async fn submit(
        &self,
        contract: &str,
        address: Address,
        constructor_arguments: &[Value],
    ) -> Result<String, VerificationError> {
        let artifact = self.artifacts.get(contract)?;
        let build_info = artifact.build_info()?;
        let encoded_arguments =
            hex::encode(artifact.encode_constructor_arguments(constructor_arguments)?);
        let source = serde_json::to_string(&build_info.input)
            .map_err(|e| VerificationError::Artifact(e.to_string()))?;

        let address = address.to_string();
        let compiler = format!("v{}", build_info.solc_long_version);
        let name = artifact.fully_qualified_name();
        let chain_id = self.config.chain_id.to_string();

        let form = [
            ("apikey", self.config.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", source.as_str()),
            ("codeformat", CODE_FORMAT),
            ("contractname", name.as_str()),
            ("compilerversion", compiler.as_str()),
            // Etherscan's spelling.
            ("constructorArguements", encoded_arguments.as_str()),
        ];

        let response: EtherscanResponse = self
            .client
            .post(self.config.api_url.clone())
            .query(&[("chainid", chain_id.as_str())])
            .form(&form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| VerificationError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;

        let text = response.result_text();
        if response.is_ok() {
            tracing::debug!(contract = %name, guid = %text, "Verification request accepted");
            Ok(text)
        } else if is_already_verified(&text) {
            Err(VerificationError::AlreadyVerified)
        } else {
            Err(VerificationError::Rejected(text))
        }
    }

    async fn check_status(&self, guid: &str) -> Result<(), StatusCheck> {
        let response = self
            .get(&[
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .await
            .map_err(StatusCheck::Done)?;

        let text = response.result_text();
        if response.is_ok() {
            return Ok(());
        }
        if text.to_lowercase().contains("pending") {
            return Err(StatusCheck::Pending);
        }
        if is_already_verified(&text) {
            return Err(StatusCheck::Done(VerificationError::AlreadyVerified));
        }
        Err(StatusCheck::Done(VerificationError::Rejected(text)))
    }
}

fn is_already_verified(message: &str) -> bool {
    message.to_lowercase().contains("already verified")
}

impl Verifier for EtherscanVerifier {
    async fn verify(
        &self,
        contract: &str,
        address: Address,
        constructor_arguments: &[Value],
    ) -> Result<(), VerificationError> {
        match self.is_verified(address).await {
            Ok(true) => return Err(VerificationError::AlreadyVerified),
            Ok(false) => {}
            Err(e) => tracing::debug!(%address, error = %e, "Could not query verification state"),
        }

        let guid = self.submit(contract, address, constructor_arguments).await?;

        (|| async { self.check_status(&guid).await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.config.poll_interval)
                    .with_max_times(self.config.max_status_checks),
            )
            .when(|e| matches!(e, StatusCheck::Pending))
            .notify(|_, dur| tracing::trace!(%guid, ?dur, "Verification pending"))
            .await
            .map_err(|e| match e {
                StatusCheck::Pending => VerificationError::Timeout(
                    self.config.poll_interval * self.config.max_status_checks as u32,
                ),
                StatusCheck::Done(err) => err,
            })
    }
}
