//! Minimal Solana JSON-RPC access for building bundles

use crate::client::parse_rpc_response;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use types::{utils::generate_request_id, JsonRpcRequest, RelayError, RpcContext};

const UPSTREAM: &str = "upstream";

/// Blockhash that transactions in a new bundle should reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct BlockhashEnvelope {
    #[serde(default)]
    context: Option<RpcContext>,
    value: RecentBlockhash,
}

/// Client for the upstream Solana RPC node
#[derive(Debug, Clone)]
pub struct UpstreamRpc {
    http_client: Client,
    rpc_url: String,
    commitment: String,
}

impl UpstreamRpc {
    pub fn new(
        rpc_url: impl Into<String>,
        commitment: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Connection {
                relay: UPSTREAM.to_string(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.into(),
            commitment: commitment.into(),
        })
    }

    pub async fn latest_blockhash(&self) -> Result<RecentBlockhash, RelayError> {
        let request = JsonRpcRequest::new(
            generate_request_id(),
            "getLatestBlockhash",
            json!({ "commitment": self.commitment }),
        );

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Timeout {
                        relay: UPSTREAM.to_string(),
                        endpoint: self.rpc_url.clone(),
                    }
                } else {
                    RelayError::Connection {
                        relay: UPSTREAM.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let raw_text = response.text().await.map_err(|e| RelayError::InvalidResponse {
            relay: UPSTREAM.to_string(),
            message: format!("error reading response body: {}", e),
            raw: String::new(),
        })?;

        let result = parse_rpc_response(UPSTREAM, status, &raw_text)?;
        let envelope: BlockhashEnvelope =
            serde_json::from_value(result).map_err(|e| RelayError::InvalidResponse {
                relay: UPSTREAM.to_string(),
                message: format!("unexpected getLatestBlockhash result: {}", e),
                raw: raw_text.clone(),
            })?;

        tracing::debug!(
            blockhash = %envelope.value.blockhash,
            last_valid_block_height = envelope.value.last_valid_block_height,
            slot = envelope.context.map(|c| c.slot),
            "Fetched latest blockhash"
        );
        Ok(envelope.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, method},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_latest_blockhash() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getLatestBlockhash",
                "params": [{ "commitment": "finalized" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "context": { "slot": 2792 },
                    "value": {
                        "blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
                        "lastValidBlockHeight": 3090
                    }
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let rpc = UpstreamRpc::new(mock_server.uri(), "finalized", Duration::from_secs(5)).unwrap();
        let blockhash = rpc.latest_blockhash().await.unwrap();

        assert_eq!(blockhash.blockhash, "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N");
        assert_eq!(blockhash.last_valid_block_height, 3090);
    }

    #[tokio::test]
    async fn test_latest_blockhash_rpc_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32005, "message": "Node is behind" }
            })))
            .mount(&mock_server)
            .await;

        let rpc = UpstreamRpc::new(mock_server.uri(), "confirmed", Duration::from_secs(5)).unwrap();
        let err = rpc.latest_blockhash().await.unwrap_err();
        assert!(matches!(err, RelayError::Rpc { code: -32005, .. }));
    }
}
