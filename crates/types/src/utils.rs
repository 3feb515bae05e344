//! Utility functions and helpers

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a Solana public key
pub const PUBKEY_LEN: usize = 32;

/// Text encoding used to carry serialized transactions over JSON-RPC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TxEncoding {
    /// Base-58, the relay default
    #[default]
    Base58,
    /// Base-64
    Base64,
}

impl TxEncoding {
    /// Encode raw bytes
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            TxEncoding::Base58 => bs58::encode(bytes).into_string(),
            TxEncoding::Base64 => STANDARD.encode(bytes),
        }
    }

    /// Decode text back to raw bytes
    pub fn decode(&self, text: &str) -> Result<Vec<u8>, String> {
        match self {
            TxEncoding::Base58 => bs58::decode(text)
                .into_vec()
                .map_err(|e| format!("invalid base58: {}", e)),
            TxEncoding::Base64 => STANDARD
                .decode(text)
                .map_err(|e| format!("invalid base64: {}", e)),
        }
    }

    /// Value for the relay's optional `encoding` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            TxEncoding::Base58 => "base58",
            TxEncoding::Base64 => "base64",
        }
    }
}

impl fmt::Display for TxEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base58" => Ok(TxEncoding::Base58),
            "base64" => Ok(TxEncoding::Base64),
            other => Err(format!("unknown transaction encoding: {}", other)),
        }
    }
}

/// Validate a base-58 Solana public key
pub fn is_valid_pubkey(address: &str) -> bool {
    match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes.len() == PUBKEY_LEN,
        Err(_) => false,
    }
}

/// Generate a JSON-RPC request id
pub fn generate_request_id() -> u64 {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Join a base URL and a path segment with exactly one slash
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}
