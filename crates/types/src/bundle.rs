//! Bundle-related types and structures

use crate::error::{BundlerError, Result};
use crate::relay::TipAccount;
use crate::utils::TxEncoding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier the relay returns for a submitted bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleHandle(String);

impl BundleHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BundleHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What a transaction is for within its bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "role")]
pub enum TxRole {
    /// Ordinary payload transaction
    Payload,
    /// The fee-to-the-relay transaction, paying the given tip account
    Tip { account: TipAccount },
}

/// An already-signed, already-serialized transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    bytes: Vec<u8>,
    role: TxRole,
}

impl SignedTransaction {
    /// Wrap a serialized payload transaction
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            role: TxRole::Payload,
        }
    }

    /// Wrap a serialized tip transaction paying `account`
    pub fn tip(bytes: Vec<u8>, account: TipAccount) -> Self {
        Self {
            bytes,
            role: TxRole::Tip { account },
        }
    }

    /// Decode a transaction from its text encoding
    pub fn decode(encoded: &str, encoding: TxEncoding) -> std::result::Result<Self, String> {
        let bytes = encoding.decode(encoded.trim())?;
        if bytes.is_empty() {
            return Err("empty transaction payload".to_string());
        }
        Ok(Self::new(bytes))
    }

    /// Encode the serialized bytes for the wire
    pub fn encode(&self, encoding: TxEncoding) -> String {
        encoding.encode(&self.bytes)
    }

    /// Re-designate this transaction as the tip transaction
    pub fn into_tip(self, account: TipAccount) -> Self {
        Self::tip(self.bytes, account)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn role(&self) -> &TxRole {
        &self.role
    }

    pub fn is_tip(&self) -> bool {
        matches!(self.role, TxRole::Tip { .. })
    }

    /// Tip account this transaction pays, if it is the tip transaction
    pub fn tip_account(&self) -> Option<&TipAccount> {
        match &self.role {
            TxRole::Tip { account } => Some(account),
            TxRole::Payload => None,
        }
    }
}

/// An ordered, size-checked group of transactions submitted atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    transactions: Vec<SignedTransaction>,
}

impl Bundle {
    /// Package transactions in the order given, enforcing `1..=limit`
    pub fn try_new(transactions: Vec<SignedTransaction>, limit: usize) -> Result<Self> {
        if transactions.is_empty() {
            return Err(BundlerError::EmptyBundle);
        }
        if transactions.len() > limit {
            return Err(BundlerError::BundleTooLarge {
                len: transactions.len(),
                limit,
            });
        }
        Ok(Self { transactions })
    }

    pub fn transactions(&self) -> &[SignedTransaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Always false for a constructed bundle
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Position and transaction designated as the tip
    pub fn tip(&self) -> Option<(usize, &SignedTransaction)> {
        self.transactions.iter().enumerate().find(|(_, tx)| tx.is_tip())
    }

    /// Wire form of every transaction, in bundle order
    pub fn encoded(&self, encoding: TxEncoding) -> Vec<String> {
        self.transactions.iter().map(|tx| tx.encode(encoding)).collect()
    }
}

/// Status the relay reports for a bundle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    /// Relay has no record (yet), or reported something unrecognized
    Unknown,
    /// Fate not yet decided
    Pending,
    /// Included on-chain
    Landed,
    /// Relay-confirmed failure
    Failed,
}

impl BundleStatus {
    /// Map the relay's inflight status string
    pub fn from_wire(status: &str) -> Self {
        match status {
            "Pending" => BundleStatus::Pending,
            "Landed" => BundleStatus::Landed,
            "Failed" => BundleStatus::Failed,
            _ => BundleStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BundleStatus::Landed | BundleStatus::Failed)
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BundleStatus::Unknown => "unknown",
            BundleStatus::Pending => "pending",
            BundleStatus::Landed => "landed",
            BundleStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl Default for BundleStatus {
    fn default() -> Self {
        BundleStatus::Unknown
    }
}

/// Details of a bundle that landed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandedBundle {
    #[serde(rename = "bundleId")]
    pub handle: BundleHandle,
    /// Slot the bundle landed in, when reported
    #[serde(rename = "landedSlot")]
    pub landed_slot: Option<u64>,
    /// Signatures from the finalized status query, in bundle order
    pub transactions: Vec<String>,
    #[serde(rename = "resolvedAt")]
    pub resolved_at: DateTime<Utc>,
}

/// Which kind of terminal outcome tracking produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Landed,
    Failed,
    TimedOut,
}

/// Terminal result of tracking one bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrackingOutcome {
    /// Included on-chain
    Landed(LandedBundle),
    /// Relay-confirmed failure
    Failed {
        #[serde(rename = "bundleId")]
        handle: BundleHandle,
        reason: Option<String>,
        #[serde(rename = "resolvedAt")]
        resolved_at: DateTime<Utc>,
    },
    /// Budget exhausted with no terminal signal. The bundle may still land;
    /// this is not a failure.
    TimedOut {
        #[serde(rename = "bundleId")]
        handle: BundleHandle,
        #[serde(rename = "waitedMs")]
        waited_ms: u64,
        /// Status queries issued, for poll-based tracking
        attempts: Option<u32>,
        #[serde(rename = "resolvedAt")]
        resolved_at: DateTime<Utc>,
    },
}

impl TrackingOutcome {
    pub fn failed(handle: BundleHandle, reason: Option<String>) -> Self {
        TrackingOutcome::Failed {
            handle,
            reason,
            resolved_at: Utc::now(),
        }
    }

    pub fn timed_out(handle: BundleHandle, waited: Duration, attempts: Option<u32>) -> Self {
        TrackingOutcome::TimedOut {
            handle,
            waited_ms: waited.as_millis() as u64,
            attempts,
            resolved_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            TrackingOutcome::Landed(_) => OutcomeKind::Landed,
            TrackingOutcome::Failed { .. } => OutcomeKind::Failed,
            TrackingOutcome::TimedOut { .. } => OutcomeKind::TimedOut,
        }
    }

    pub fn handle(&self) -> &BundleHandle {
        match self {
            TrackingOutcome::Landed(landed) => &landed.handle,
            TrackingOutcome::Failed { handle, .. } | TrackingOutcome::TimedOut { handle, .. } => {
                handle
            }
        }
    }

    /// Landed becomes `Ok`; the other outcomes become their distinct errors
    pub fn into_result(self) -> Result<LandedBundle> {
        match self {
            TrackingOutcome::Landed(landed) => Ok(landed),
            TrackingOutcome::Failed { handle, reason, .. } => Err(BundlerError::BundleFailed {
                bundle_id: handle.to_string(),
                reason,
            }),
            TrackingOutcome::TimedOut {
                handle, waited_ms, ..
            } => Err(BundlerError::TrackingTimedOut {
                bundle_id: handle.to_string(),
                waited_ms,
            }),
        }
    }
}
