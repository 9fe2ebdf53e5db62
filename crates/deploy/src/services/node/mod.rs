//! Contract deployment through an Ethereum JSON-RPC node.

mod tx;

use std::time::Duration;

use alloy_core::primitives::{Address, B256};
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

pub use tx::{LegacyTransaction, LocalSigner};

use crate::{
    artifacts::ArtifactStore,
    errors::{BroadcastError, ConfigurationError, ConfirmationError},
    rpc::{self, RpcClient},
    traits::{Broadcaster, Confirmation, PendingTransaction},
};

/// Default time a deployment transaction may take to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Default delay between receipt queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Extra gas added on top of the node's estimate, in percent.
const GAS_HEADROOM_PERCENT: u64 = 20;

/// Settings for [`NodeBroadcaster`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub rpc_url: Url,
    /// Queried with `eth_chainId` when unset.
    pub chain_id: Option<u64>,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl NodeConfig {
    pub fn new(rpc_url: Url) -> Self {
        Self {
            rpc_url,
            chain_id: None,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Signs deployment transactions locally and submits them to a node.
#[derive(Debug, Clone)]
pub struct NodeBroadcaster {
    rpc: RpcClient,
    signer: LocalSigner,
    chain_id: u64,
    artifacts: ArtifactStore,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    #[serde(default, deserialize_with = "rpc::deserialize_opt_quantity")]
    status: Option<u64>,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default, deserialize_with = "rpc::deserialize_opt_quantity")]
    block_number: Option<u64>,
}

/// Receipt polling outcome that is worth retrying.
enum Poll {
    Pending,
    Failed(String),
}

impl NodeBroadcaster {
    /// Build the signer and resolve the chain id.
    pub async fn connect(
        config: NodeConfig,
        signing_key: &str,
        artifacts: ArtifactStore,
    ) -> Result<Self, ConfigurationError> {
        let signer = LocalSigner::from_hex(signing_key)?;
        let rpc = RpcClient::new(config.rpc_url.clone()).map_err(|e| ConfigurationError::Invalid {
            field: "network_url",
            reason: format!("{e:#}"),
        })?;

        let chain_id = match config.chain_id {
            Some(id) => id,
            None => rpc.chain_id().await.map_err(|e| ConfigurationError::Invalid {
                field: "network_url",
                reason: format!("failed to query chain id: {e:#}"),
            })?,
        };

        tracing::debug!(
            rpc_url = %config.rpc_url,
            chain_id,
            deployer = %signer.address(),
            artifacts = artifacts.len(),
            "Node broadcaster ready"
        );

        Ok(Self {
            rpc,
            signer,
            chain_id,
            artifacts,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn quantity(&self, method: &str, params: Vec<Value>) -> Result<u128, BroadcastError> {
        let value: String = self
            .rpc
            .call(method, params)
            .await
            .map_err(|e| BroadcastError::Rejected(format!("{e:#}")))?;
        rpc::parse_quantity_u128(&value).map_err(|e| BroadcastError::Rejected(format!("{e:#}")))
    }

    async fn poll_receipt(&self, hash: B256) -> Result<Receipt, Poll> {
        let receipt: Option<Receipt> = self
            .rpc
            .call("eth_getTransactionReceipt", vec![json!(hash)])
            .await
            .map_err(|e| Poll::Failed(format!("{e:#}")))?;
        receipt.ok_or(Poll::Pending)
    }
}

/// Gas limit for a node estimate, `None` on overflow.
fn with_headroom(estimate: u64) -> Option<u64> {
    estimate
        .checked_mul(GAS_HEADROOM_PERCENT)
        .map(|extra| extra / 100)
        .and_then(|extra| estimate.checked_add(extra))
}

impl Broadcaster for NodeBroadcaster {
    async fn deployer(&self) -> Result<Address, ConfigurationError> {
        let address = self.signer.address();
        match self
            .rpc
            .call::<String>("eth_getBalance", vec![json!(address), json!("latest")])
            .await
        {
            Ok(balance) => {
                tracing::info!(deployer = %address, balance = %balance, "Deployer account")
            }
            Err(e) => {
                tracing::warn!(deployer = %address, error = %e, "Could not query deployer balance")
            }
        }
        Ok(address)
    }

    async fn broadcast(
        &self,
        contract: &str,
        constructor_arguments: &[Value],
    ) -> Result<Option<PendingTransaction>, BroadcastError> {
        let artifact = self.artifacts.get(contract)?;
        let data = artifact.deployment_data(constructor_arguments)?;
        let from = self.signer.address();

        let nonce = self
            .quantity("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await?;
        let gas_price = self.quantity("eth_gasPrice", vec![]).await?;
        let estimate = self
            .quantity("eth_estimateGas", vec![json!({ "from": from, "data": data })])
            .await?;

        let nonce = u64::try_from(nonce).map_err(|e| BroadcastError::Rejected(e.to_string()))?;
        let estimate =
            u64::try_from(estimate).map_err(|e| BroadcastError::Rejected(e.to_string()))?;
        let gas_limit = with_headroom(estimate).ok_or_else(|| {
            BroadcastError::Rejected(format!("gas estimate {estimate} leaves no room for headroom"))
        })?;

        let tx = LegacyTransaction::create(nonce, gas_price, gas_limit, data);
        let raw = self.signer.sign(&tx, self.chain_id)?;

        tracing::debug!(
            contract = %artifact.fully_qualified_name(),
            nonce,
            gas_price,
            gas_limit,
            "Submitting deployment transaction"
        );

        let hash: Option<B256> = self
            .rpc
            .call("eth_sendRawTransaction", vec![json!(raw)])
            .await
            .map_err(|e| BroadcastError::Rejected(format!("{e:#}")))?;

        Ok(hash.map(|hash| PendingTransaction { hash }))
    }

    async fn wait(&self, pending: &PendingTransaction) -> Result<Confirmation, ConfirmationError> {
        let hash = pending.hash;
        let attempts = (self.confirmation_timeout.as_millis()
            / self.poll_interval.as_millis().max(1))
        .max(1) as usize;

        let receipt = (|| async { self.poll_receipt(hash).await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.poll_interval)
                    .with_max_times(attempts),
            )
            .when(|e| matches!(e, Poll::Pending))
            .notify(|_, dur| tracing::trace!(tx = %hash, ?dur, "Receipt not available yet"))
            .await
            .map_err(|e| match e {
                Poll::Pending => ConfirmationError::Timeout {
                    tx: hash,
                    after: self.confirmation_timeout,
                },
                Poll::Failed(reason) => ConfirmationError::Receipt { tx: hash, reason },
            })?;

        Ok(Confirmation {
            finalized: receipt.status == Some(1),
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
        })
    }
}
