//! Error types for the Jito bundler system

use serde_json::Value;
use thiserror::Error;

/// Main error type for the bundler system
#[derive(Error, Debug)]
pub enum BundlerError {
    /// Configuration related errors (missing endpoint, bad values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The relay published zero tip accounts
    #[error("Configuration error: relay returned an empty tip account set")]
    EmptyTipAccountSet,

    /// No transactions were supplied for the bundle
    #[error("Bundle must contain at least one transaction")]
    EmptyBundle,

    /// More transactions than the relay accepts in one bundle
    #[error("Bundle too large: {len} transactions exceeds the limit of {limit}")]
    BundleTooLarge { len: usize, limit: usize },

    /// Caller supplied a transaction that could not be decoded
    #[error("Invalid transaction at position {position}: {message}")]
    InvalidTransaction { position: usize, message: String },

    /// Relay communication failure (network, HTTP, malformed body)
    #[error("Transport error: {0}")]
    Transport(#[source] RelayError),

    /// Relay refused the bundle synchronously (validation or simulation)
    #[error("Bundle rejected by relay {relay}: {message}")]
    SubmissionRejected {
        relay: String,
        message: String,
        raw: String,
    },

    /// Relay confirmed the bundle failed
    #[error("Bundle {bundle_id} failed")]
    BundleFailed {
        bundle_id: String,
        reason: Option<String>,
    },

    /// Tracking budget ran out before any terminal status; the outcome is unknown
    #[error("Tracking bundle {bundle_id} timed out after {waited_ms}ms; outcome unknown")]
    TrackingTimedOut { bundle_id: String, waited_ms: u64 },

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for bundler operations
pub type Result<T> = std::result::Result<T, BundlerError>;

impl BundlerError {
    /// Whether the caller may reasonably retry the failed operation.
    ///
    /// Only transient transport failures qualify. Rejections, relay-confirmed
    /// failures and tracking timeouts never do.
    pub fn is_retriable(&self) -> bool {
        match self {
            BundlerError::Transport(err) => err.is_retriable(),
            _ => false,
        }
    }

    /// Raw upstream payload attached to this error, if any
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            BundlerError::Transport(err) => err.raw_payload(),
            BundlerError::SubmissionRejected { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Relay communication specific errors
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// Request did not complete within the configured timeout
    #[error("Connection timeout to relay {relay} ({endpoint})")]
    Timeout { relay: String, endpoint: String },

    /// Connection could not be established or was dropped
    #[error("Connection error to relay {relay}: {message}")]
    Connection { relay: String, message: String },

    /// Non-success HTTP status without a JSON-RPC error body
    #[error("HTTP error from relay {relay}: {status}: {body}")]
    Http {
        relay: String,
        status: u16,
        body: String,
    },

    /// JSON-RPC error object returned by the relay
    #[error("Relay {relay} returned error {code}: {message}")]
    Rpc {
        relay: String,
        code: i64,
        message: String,
        data: Option<Value>,
        raw: String,
    },

    /// Body could not be parsed into the expected shape
    #[error("Invalid response format from relay {relay}: {message}")]
    InvalidResponse {
        relay: String,
        message: String,
        raw: String,
    },

    /// Streaming channel failure
    #[error("Subscription error on relay {relay}: {message}")]
    Subscription { relay: String, message: String },
}

impl RelayError {
    /// Transient failures that may succeed if issued again
    pub fn is_retriable(&self) -> bool {
        match self {
            RelayError::Timeout { .. }
            | RelayError::Connection { .. }
            | RelayError::Subscription { .. } => true,
            RelayError::Http { status, .. } => *status >= 500 || *status == 429,
            RelayError::Rpc { .. } | RelayError::InvalidResponse { .. } => false,
        }
    }

    /// The upstream body exactly as received
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            RelayError::Http { body, .. } => Some(body),
            RelayError::Rpc { raw, .. } | RelayError::InvalidResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Name of the relay the error came from
    pub fn relay(&self) -> &str {
        match self {
            RelayError::Timeout { relay, .. }
            | RelayError::Connection { relay, .. }
            | RelayError::Http { relay, .. }
            | RelayError::Rpc { relay, .. }
            | RelayError::InvalidResponse { relay, .. }
            | RelayError::Subscription { relay, .. } => relay,
        }
    }
}

/// Configuration specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Parse error
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    /// Validation error
    #[error("Configuration validation error: {field}: {message}")]
    ValidationError { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid value
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl From<RelayError> for BundlerError {
    fn from(err: RelayError) -> Self {
        BundlerError::Transport(err)
    }
}

impl From<ConfigError> for BundlerError {
    fn from(err: ConfigError) -> Self {
        BundlerError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        let timeout = RelayError::Timeout {
            relay: "jito".to_string(),
            endpoint: "http://localhost/bundles".to_string(),
        };
        assert!(timeout.is_retriable());

        let server = RelayError::Http {
            relay: "jito".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(server.is_retriable());

        let client = RelayError::Http {
            relay: "jito".to_string(),
            status: 400,
            body: "bad".to_string(),
        };
        assert!(!client.is_retriable());

        let rejected = BundlerError::SubmissionRejected {
            relay: "jito".to_string(),
            message: "bundle simulation failed".to_string(),
            raw: "{}".to_string(),
        };
        assert!(!rejected.is_retriable());
        assert!(!BundlerError::TrackingTimedOut {
            bundle_id: "abc".to_string(),
            waited_ms: 1000
        }
        .is_retriable());
    }

    #[test]
    fn test_raw_payload_is_preserved() {
        let raw = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"bad tx"},"id":1}"#;
        let err: BundlerError = RelayError::Rpc {
            relay: "jito".to_string(),
            code: -32602,
            message: "bad tx".to_string(),
            data: None,
            raw: raw.to_string(),
        }
        .into();

        assert_eq!(err.raw_payload(), Some(raw));
    }

    #[test]
    fn test_timeout_and_failure_messages_differ() {
        let failed = BundlerError::BundleFailed {
            bundle_id: "abc".to_string(),
            reason: None,
        };
        let timed_out = BundlerError::TrackingTimedOut {
            bundle_id: "abc".to_string(),
            waited_ms: 250_000,
        };

        assert!(timed_out.to_string().contains("outcome unknown"));
        assert!(!failed.to_string().contains("unknown"));
    }
}
