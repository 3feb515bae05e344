//! Bundle submission

use relay_client::BundleRelay;
use std::sync::Arc;
use types::{Bundle, BundleHandle, BundlerError, RelayError, Result, TxEncoding};

/// Sends assembled bundles to the relay. Never retries.
#[derive(Clone)]
pub struct BundleSubmitter {
    relay: Arc<dyn BundleRelay>,
    encoding: TxEncoding,
}

impl BundleSubmitter {
    pub fn new(relay: Arc<dyn BundleRelay>, encoding: TxEncoding) -> Self {
        Self { relay, encoding }
    }

    /// Encode every transaction and issue one `sendBundle`
    pub async fn submit(&self, bundle: &Bundle) -> Result<BundleHandle> {
        let encoded = bundle.encoded(self.encoding);

        tracing::debug!(
            relay = %self.relay.name(),
            tx_count = encoded.len(),
            encoding = %self.encoding,
            "Submitting bundle"
        );

        match self.relay.send_bundle(encoded).await {
            Ok(handle) => {
                tracing::info!(relay = %self.relay.name(), bundle_id = %handle, "Bundle submitted");
                Ok(handle)
            }
            Err(RelayError::Rpc {
                relay,
                code,
                message,
                raw,
                ..
            }) => {
                tracing::error!(relay = %relay, code, error = %message, "Bundle rejected by relay");
                Err(BundlerError::SubmissionRejected {
                    relay,
                    message: format!("{} (code {})", message, code),
                    raw,
                })
            }
            Err(e) => {
                tracing::warn!(
                    relay = %self.relay.name(),
                    error = %e,
                    retriable = e.is_retriable(),
                    "Bundle submission failed in transport"
                );
                Err(BundlerError::Transport(e))
            }
        }
    }
}
