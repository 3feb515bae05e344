//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use types::{RelayEndpoint, TxEncoding};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Block-engine relay configuration
    pub relay: RelayConfig,
    /// Upstream Solana RPC configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Bundle assembly configuration
    #[serde(default)]
    pub bundle: BundleConfig,
    /// Status tracking configuration
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay name used in logs
    #[serde(default = "default_relay_name")]
    pub name: String,
    /// Base URL of the block engine JSON-RPC API
    pub url: String,
    /// WebSocket URL for bundle result subscriptions
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Path receiving `sendBundle` and `getTipAccounts`
    #[serde(default = "default_bundles_path")]
    pub bundles_path: String,
    /// Path receiving `getInflightBundleStatuses`
    #[serde(default = "default_inflight_status_path")]
    pub inflight_status_path: String,
    /// Path receiving `getBundleStatuses`
    #[serde(default = "default_bundle_status_path")]
    pub bundle_status_path: String,
    /// Transaction wire encoding
    #[serde(default)]
    pub encoding: TxEncoding,
}

/// Upstream Solana RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Solana JSON-RPC URL used for recent blockhashes
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Commitment level for blockhash queries
    #[serde(default = "default_commitment")]
    pub commitment: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Bundle assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Relay-imposed maximum number of transactions per bundle
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
}

/// How bundle status is followed after submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStrategy {
    /// Query inflight status on a fixed interval
    #[default]
    Poll,
    /// Wait for pushed bundle results on a streaming channel
    Event,
}

impl fmt::Display for TrackingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingStrategy::Poll => f.write_str("poll"),
            TrackingStrategy::Event => f.write_str("event"),
        }
    }
}

impl std::str::FromStr for TrackingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poll" => Ok(TrackingStrategy::Poll),
            "event" => Ok(TrackingStrategy::Event),
            other => Err(format!("unknown tracking strategy: {}", other)),
        }
    }
}

/// Status tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Strategy used to follow submitted bundles
    #[serde(default)]
    pub strategy: TrackingStrategy,
    /// Delay between inflight status queries in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of inflight status queries
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Wall-clock limit for event-driven tracking in seconds
    #[serde(default = "default_event_timeout_seconds")]
    pub event_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_relay_name() -> String {
    "jito".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_bundles_path() -> String {
    "bundles".to_string()
}

fn default_inflight_status_path() -> String {
    "getInflightBundleStatuses".to_string()
}

fn default_bundle_status_path() -> String {
    "getBundleStatuses".to_string()
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_max_transactions() -> usize {
    5
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_max_poll_attempts() -> u32 {
    50
}

fn default_event_timeout_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Config {
    /// Relay endpoint used by the relay clients
    pub fn relay_endpoint(&self) -> RelayEndpoint {
        RelayEndpoint {
            name: self.relay.name.clone(),
            url: self.relay.url.clone(),
            ws_url: self.relay.ws_url.clone(),
            timeout_seconds: self.relay.timeout_seconds,
            bundles_path: self.relay.bundles_path.clone(),
            inflight_status_path: self.relay.inflight_status_path.clone(),
            bundle_status_path: self.relay.bundle_status_path.clone(),
            encoding: self.relay.encoding,
        }
    }
}

impl TrackingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_secs(self.event_timeout_seconds)
    }

    /// Longest a poll-based track can take
    pub fn poll_budget(&self) -> Duration {
        self.poll_interval() * self.max_poll_attempts
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            upstream: UpstreamConfig::default(),
            bundle: BundleConfig::default(),
            tracking: TrackingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            name: default_relay_name(),
            url: "https://mainnet.block-engine.jito.wtf/api/v1".to_string(),
            ws_url: None,
            timeout_seconds: default_timeout_seconds(),
            bundles_path: default_bundles_path(),
            inflight_status_path: default_inflight_status_path(),
            bundle_status_path: default_bundle_status_path(),
            encoding: TxEncoding::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            max_transactions: default_max_transactions(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            strategy: TrackingStrategy::default(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            event_timeout_seconds: default_event_timeout_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_budget() {
        let tracking = TrackingConfig::default();
        assert_eq!(tracking.poll_budget(), Duration::from_secs(250));
        assert_eq!(tracking.event_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_relay_endpoint_carries_settings() {
        let mut config = Config::default();
        config.relay.encoding = TxEncoding::Base64;
        config.relay.ws_url = Some("wss://relay.example.com/ws".to_string());

        let endpoint = config.relay_endpoint();
        assert_eq!(endpoint.encoding, TxEncoding::Base64);
        assert_eq!(endpoint.ws_url.as_deref(), Some("wss://relay.example.com/ws"));
        assert_eq!(endpoint.bundles_path, "bundles");
    }
}
