//! HTTP JSON-RPC client for a block-engine relay

use crate::traits::BundleRelay;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use types::{
    utils::generate_request_id, BundleHandle, FinalizedBundleStatus, InflightBundleStatus,
    JsonRpcRequest, JsonRpcResponse, RelayEndpoint, RelayError, RelayMethod, StatusEnvelope,
    TxEncoding,
};

/// HTTP client for a single relay.
///
/// Issues exactly one request per call and never retries; retry policy
/// belongs to the caller. Cloning is cheap and clones share the connection
/// pool, so one client can serve many concurrently tracked bundles.
#[derive(Debug, Clone)]
pub struct RelayClient {
    endpoint: RelayEndpoint,
    http_client: Client,
}

impl RelayClient {
    /// Create a new relay client
    pub fn new(endpoint: RelayEndpoint) -> Result<Self, RelayError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_seconds))
            .user_agent(concat!("jito-bundler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RelayError::Connection {
                relay: endpoint.name.clone(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Get relay configuration
    pub fn endpoint(&self) -> &RelayEndpoint {
        &self.endpoint
    }

    /// Issue one JSON-RPC call and return its `result` (null when absent)
    pub async fn call(&self, method: RelayMethod, params: Value) -> Result<Value, RelayError> {
        let request = JsonRpcRequest::new(generate_request_id(), method.as_str(), params);
        self.execute(method, &request).await
    }

    async fn execute(
        &self,
        method: RelayMethod,
        request: &JsonRpcRequest,
    ) -> Result<Value, RelayError> {
        let relay = &self.endpoint.name;
        let url = self.endpoint.url_for(method);

        tracing::debug!(relay = %relay, method = %method, endpoint = %url, id = request.id, "Relay request");

        let response = timeout(
            Duration::from_secs(self.endpoint.timeout_seconds),
            self.http_client.post(&url).json(request).send(),
        )
        .await
        .map_err(|_| RelayError::Timeout {
            relay: relay.clone(),
            endpoint: url.clone(),
        })?
        .map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout {
                    relay: relay.clone(),
                    endpoint: url.clone(),
                }
            } else {
                RelayError::Connection {
                    relay: relay.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let raw_text = response.text().await.map_err(|e| RelayError::InvalidResponse {
            relay: relay.clone(),
            message: format!("error reading response body: {}", e),
            raw: String::new(),
        })?;

        let result = parse_rpc_response(relay, status.as_u16(), &raw_text);
        if let Err(ref e) = result {
            tracing::warn!(relay = %relay, method = %method, error = %e, "Relay call failed");
        }
        result
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: RelayMethod,
        params: Value,
    ) -> Result<T, RelayError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value.clone()).map_err(|e| RelayError::InvalidResponse {
            relay: self.endpoint.name.clone(),
            message: format!("unexpected {} result: {}", method, e),
            raw: value.to_string(),
        })
    }
}

/// Turn an HTTP status and body into a JSON-RPC result or a `RelayError`
/// carrying the body verbatim.
pub(crate) fn parse_rpc_response(relay: &str, status: u16, raw_text: &str) -> Result<Value, RelayError> {
    let parsed = serde_json::from_str::<JsonRpcResponse>(raw_text);

    if let Ok(JsonRpcResponse {
        error: Some(error), ..
    }) = &parsed
    {
        return Err(RelayError::Rpc {
            relay: relay.to_string(),
            code: error.code,
            message: error.message.clone(),
            data: error.data.clone(),
            raw: raw_text.to_string(),
        });
    }

    if !(200..300).contains(&status) {
        return Err(RelayError::Http {
            relay: relay.to_string(),
            status,
            body: raw_text.to_string(),
        });
    }

    match parsed {
        Ok(response) => Ok(response.result.unwrap_or(Value::Null)),
        Err(e) => Err(RelayError::InvalidResponse {
            relay: relay.to_string(),
            message: format!("invalid JSON response: {}", e),
            raw: raw_text.to_string(),
        }),
    }
}

/// Pull the bundle id out of a `sendBundle` result
fn parse_bundle_id(relay: &str, result: &Value) -> Result<BundleHandle, RelayError> {
    // { "result": "<id>" }
    if let Some(id) = result.as_str() {
        return Ok(BundleHandle::new(id));
    }
    // { "result": { "bundleId": "<id>" } }
    if let Some(id) = result.get("bundleId").and_then(|v| v.as_str()) {
        return Ok(BundleHandle::new(id));
    }

    Err(RelayError::InvalidResponse {
        relay: relay.to_string(),
        message: "sendBundle result carries no bundle id".to_string(),
        raw: result.to_string(),
    })
}

#[async_trait]
impl BundleRelay for RelayClient {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    async fn get_tip_accounts(&self) -> Result<Vec<String>, RelayError> {
        self.call_typed(RelayMethod::GetTipAccounts, json!([])).await
    }

    async fn send_bundle(&self, transactions: Vec<String>) -> Result<BundleHandle, RelayError> {
        let tx_count = transactions.len();
        let result = match self.endpoint.encoding {
            TxEncoding::Base58 => self.call(RelayMethod::SendBundle, json!(transactions)).await?,
            // Non-default encodings travel as a second positional parameter
            encoding => {
                let mut request = JsonRpcRequest::new(
                    generate_request_id(),
                    RelayMethod::SendBundle.as_str(),
                    json!(transactions),
                );
                request.params.push(json!({ "encoding": encoding.as_str() }));
                self.execute(RelayMethod::SendBundle, &request).await?
            }
        };

        let handle = parse_bundle_id(&self.endpoint.name, &result)?;
        tracing::info!(relay = %self.endpoint.name, bundle_id = %handle, tx_count, "Bundle accepted for processing");
        Ok(handle)
    }

    async fn get_inflight_bundle_status(
        &self,
        handle: &BundleHandle,
    ) -> Result<Option<InflightBundleStatus>, RelayError> {
        let envelope: Option<StatusEnvelope<InflightBundleStatus>> = self
            .call_typed(RelayMethod::GetInflightBundleStatuses, json!([handle.as_str()]))
            .await?;
        Ok(envelope.and_then(StatusEnvelope::into_first))
    }

    async fn get_bundle_status(
        &self,
        handle: &BundleHandle,
    ) -> Result<Option<FinalizedBundleStatus>, RelayError> {
        let envelope: Option<StatusEnvelope<FinalizedBundleStatus>> = self
            .call_typed(RelayMethod::GetBundleStatuses, json!([handle.as_str()]))
            .await?;
        Ok(envelope.and_then(StatusEnvelope::into_first))
    }
}
