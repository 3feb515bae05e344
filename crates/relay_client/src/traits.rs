//! Transport seams used by the bundler crate

use async_trait::async_trait;
use tokio::sync::mpsc;
use types::{BundleEvent, BundleHandle, FinalizedBundleStatus, InflightBundleStatus, RelayError};

/// Receiving end of a per-bundle event subscription
pub type BundleSubscription = mpsc::UnboundedReceiver<BundleEvent>;

/// Request/response access to the block-engine bundle API
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// Relay name for logs and errors
    fn name(&self) -> &str;

    /// Currently published tip accounts, as returned by the relay
    async fn get_tip_accounts(&self) -> Result<Vec<String>, RelayError>;

    /// Submit encoded transactions as one bundle
    async fn send_bundle(&self, transactions: Vec<String>) -> Result<BundleHandle, RelayError>;

    /// Inflight status for one bundle; `None` when the relay reports nothing
    async fn get_inflight_bundle_status(
        &self,
        handle: &BundleHandle,
    ) -> Result<Option<InflightBundleStatus>, RelayError>;

    /// Finalized status for one bundle; `None` when the relay reports nothing
    async fn get_bundle_status(
        &self,
        handle: &BundleHandle,
    ) -> Result<Option<FinalizedBundleStatus>, RelayError>;
}

/// Push-based bundle results over a long-lived channel
#[async_trait]
pub trait BundleEventSource: Send + Sync {
    /// Relay name for logs and errors
    fn name(&self) -> &str;

    /// Register interest in one bundle. Dropping the receiver unregisters it.
    async fn subscribe(&self, handle: &BundleHandle) -> Result<BundleSubscription, RelayError>;
}
