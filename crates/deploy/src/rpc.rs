//! Minimal Ethereum JSON-RPC client.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

/// Default timeout for RPC requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// A node endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: Url,
}

impl RpcClient {
    pub fn new(url: Url) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: create_client(DEFAULT_TIMEOUT)?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Make a JSON-RPC call and deserialize the result.
    ///
    /// A JSON `null` result deserializes into `None` when `T` is an `Option`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, anyhow::Error> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        let result: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = result.get("error") {
            anyhow::bail!(
                "RPC error: {}",
                error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown")
            );
        }

        let result_value = result
            .get("result")
            .context("No result in response")?
            .clone();

        serde_json::from_value(result_value)
            .with_context(|| format!("Failed to deserialize {} result", method))
    }

    pub async fn chain_id(&self) -> Result<u64, anyhow::Error> {
        let id: String = self.call("eth_chainId", vec![]).await?;
        parse_quantity(&id)
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &str) -> Result<u64, anyhow::Error> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {value}"))
}

/// Parse a `0x`-prefixed hex quantity that may exceed 64 bits (e.g. gas price).
pub fn parse_quantity_u128(value: &str) -> Result<u128, anyhow::Error> {
    u128::from_str_radix(value.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {value}"))
}

/// Deserialize an optional u64 from a hex string (with 0x prefix).
pub fn deserialize_opt_quantity<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Deserialize::deserialize(deserializer)?;
    value
        .map(|s| parse_quantity(&s).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method},
    };

    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0xaa36a7").unwrap(), 11155111);
        assert_eq!(parse_quantity_u128("0x4a817c800").unwrap(), 20_000_000_000);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_deserialize_opt_quantity() {
        #[derive(Deserialize)]
        struct Receipt {
            #[serde(default, deserialize_with = "deserialize_opt_quantity")]
            block_number: Option<u64>,
        }

        let r: Receipt = serde_json::from_value(json!({ "block_number": "0x10" })).unwrap();
        assert_eq!(r.block_number, Some(16));
        let r: Receipt = serde_json::from_value(json!({ "block_number": null })).unwrap();
        assert_eq!(r.block_number, None);
    }

    #[tokio::test]
    async fn test_call_surfaces_rpc_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": "0xaa36a7"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_sendRawTransaction" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "insufficient funds" }
            })))
            .mount(&server)
            .await;

        let rpc = RpcClient::new(server.uri().parse().unwrap()).unwrap();
        assert_eq!(rpc.chain_id().await.unwrap(), 11155111);

        let err = rpc
            .call::<String>("eth_sendRawTransaction", vec![json!("0x00")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "RPC error: insufficient funds");
    }
}
