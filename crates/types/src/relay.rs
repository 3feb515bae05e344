//! Relay-related types and structures

use crate::utils::{is_valid_pubkey, join_url, TxEncoding};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Block-engine relay endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEndpoint {
    /// Name used in logs and errors
    pub name: String,
    /// Base URL of the relay JSON-RPC API
    pub url: String,
    /// WebSocket URL for bundle result subscriptions
    pub ws_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Path for `sendBundle` and `getTipAccounts`
    pub bundles_path: String,
    /// Path for `getInflightBundleStatuses`
    pub inflight_status_path: String,
    /// Path for `getBundleStatuses`
    pub bundle_status_path: String,
    /// Wire encoding for serialized transactions
    pub encoding: TxEncoding,
}

impl RelayEndpoint {
    /// Full URL a method is posted to
    pub fn url_for(&self, method: RelayMethod) -> String {
        let path = match method {
            RelayMethod::GetTipAccounts | RelayMethod::SendBundle => &self.bundles_path,
            RelayMethod::GetInflightBundleStatuses => &self.inflight_status_path,
            RelayMethod::GetBundleStatuses => &self.bundle_status_path,
        };
        join_url(&self.url, path)
    }
}

impl Default for RelayEndpoint {
    fn default() -> Self {
        Self {
            name: "jito".to_string(),
            url: "https://mainnet.block-engine.jito.wtf/api/v1".to_string(),
            ws_url: None,
            timeout_seconds: 30,
            bundles_path: "bundles".to_string(),
            inflight_status_path: "getInflightBundleStatuses".to_string(),
            bundle_status_path: "getBundleStatuses".to_string(),
            encoding: TxEncoding::Base58,
        }
    }
}

/// JSON-RPC methods consumed from the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayMethod {
    GetTipAccounts,
    SendBundle,
    GetInflightBundleStatuses,
    GetBundleStatuses,
}

impl RelayMethod {
    /// Method name on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayMethod::GetTipAccounts => "getTipAccounts",
            RelayMethod::SendBundle => "sendBundle",
            RelayMethod::GetInflightBundleStatuses => "getInflightBundleStatuses",
            RelayMethod::GetBundleStatuses => "getBundleStatuses",
        }
    }
}

impl fmt::Display for RelayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-RPC request envelope sent to the relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Request ID
    pub id: u64,
    /// Method name
    pub method: String,
    /// Request parameters
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    /// Create a request. The relay expects the method parameters wrapped in
    /// one extra array, so `params` becomes the sole element of `params`.
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params: vec![params],
        }
    }
}

/// JSON-RPC response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request ID
    #[serde(default)]
    pub id: Option<Value>,
    /// Result payload
    #[serde(default)]
    pub result: Option<Value>,
    /// Error object
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<Value>,
}

/// A relay-designated address that receives the bundle tip
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TipAccount(String);

impl TipAccount {
    /// Base-58 address
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TipAccount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_pubkey(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("invalid tip account address: {}", s))
        }
    }
}

impl TryFrom<String> for TipAccount {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TipAccount> for String {
    fn from(account: TipAccount) -> Self {
        account.0
    }
}

impl fmt::Display for TipAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slot context attached to status responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// `{context, value}` wrapper used by both status methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct StatusEnvelope<T> {
    #[serde(default)]
    pub context: Option<RpcContext>,
    #[serde(default)]
    pub value: Option<Vec<Option<T>>>,
}

impl<T> StatusEnvelope<T> {
    /// First non-null entry, if the relay reported one
    pub fn into_first(self) -> Option<T> {
        self.value
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .next()
    }
}

/// Entry returned by `getInflightBundleStatuses`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InflightBundleStatus {
    pub bundle_id: String,
    /// `Invalid`, `Pending`, `Failed` or `Landed`
    pub status: String,
    #[serde(default)]
    pub landed_slot: Option<u64>,
}

/// Entry returned by `getBundleStatuses`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedBundleStatus {
    pub bundle_id: String,
    /// Signatures of the landed transactions, in bundle order
    #[serde(default)]
    pub transactions: Vec<String>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
    #[serde(default)]
    pub err: Option<Value>,
}

/// Push notification for one bundle on a streaming channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEvent {
    /// The relay accepted the bundle into a block
    Accepted {
        slot: Option<u64>,
        validator: Option<String>,
    },
    /// One relay-side replica of the bundle was rejected
    Rejected { reason: String },
    /// The channel reported an error
    TransportError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wraps_params_in_extra_array() {
        let request = JsonRpcRequest::new(7, "sendBundle", json!(["tx1", "tx2"]));
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "sendBundle",
                "params": [["tx1", "tx2"]]
            })
        );

        let request = JsonRpcRequest::new(1, "getTipAccounts", json!([]));
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["params"], json!([[]]));
    }

    #[test]
    fn test_endpoint_routing() {
        let endpoint = RelayEndpoint {
            url: "https://relay.example.com/api/v1/".to_string(),
            ..RelayEndpoint::default()
        };
        assert_eq!(
            endpoint.url_for(RelayMethod::GetTipAccounts),
            "https://relay.example.com/api/v1/bundles"
        );
        assert_eq!(
            endpoint.url_for(RelayMethod::SendBundle),
            "https://relay.example.com/api/v1/bundles"
        );
        assert_eq!(
            endpoint.url_for(RelayMethod::GetInflightBundleStatuses),
            "https://relay.example.com/api/v1/getInflightBundleStatuses"
        );
        assert_eq!(
            endpoint.url_for(RelayMethod::GetBundleStatuses),
            "https://relay.example.com/api/v1/getBundleStatuses"
        );
    }

    #[test]
    fn test_tip_account_parsing() {
        let account: TipAccount = "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5".parse().unwrap();
        assert_eq!(account.to_string(), "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5");
        assert!("not-an-address".parse::<TipAccount>().is_err());
    }

    #[test]
    fn test_status_envelope_handles_nulls() {
        let envelope: StatusEnvelope<InflightBundleStatus> =
            serde_json::from_value(json!({ "context": { "slot": 10 }, "value": [null] })).unwrap();
        assert!(envelope.into_first().is_none());

        let envelope: StatusEnvelope<InflightBundleStatus> =
            serde_json::from_value(json!({ "context": { "slot": 10 }, "value": null })).unwrap();
        assert!(envelope.into_first().is_none());

        let envelope: StatusEnvelope<InflightBundleStatus> = serde_json::from_value(json!({
            "context": { "slot": 10 },
            "value": [{ "bundle_id": "abc", "status": "Landed", "landed_slot": 9 }]
        }))
        .unwrap();
        let status = envelope.into_first().unwrap();
        assert_eq!(status.status, "Landed");
        assert_eq!(status.landed_slot, Some(9));
    }

    #[test]
    fn test_status_envelope_missing_fields_default_to_none() {
        // Status records carry no Default impl; the envelope must not need one
        let envelope: StatusEnvelope<FinalizedBundleStatus> = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.context.is_none());
        assert!(envelope.into_first().is_none());

        let envelope: StatusEnvelope<FinalizedBundleStatus> = serde_json::from_value(json!({
            "value": [null, {
                "bundle_id": "abc",
                "transactions": ["sig1"],
                "slot": 12,
                "confirmation_status": "finalized",
                "err": { "Ok": null }
            }]
        }))
        .unwrap();
        let status = envelope.into_first().unwrap();
        assert_eq!(status.transactions, vec!["sig1".to_string()]);
        assert_eq!(status.slot, Some(12));
    }
}
