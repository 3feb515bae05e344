//! End-to-end flow for one bundle: tip, assemble, submit, track

use crate::{BundleAssembler, BundleSubmitter, StatusTracker, TipAccountSelector};
use relay_client::BundleRelay;
use std::sync::Arc;
use types::{BundleHandle, Result, SignedTransaction, TipAccount, TrackingOutcome, TxEncoding};

/// Runs bundles through selection, assembly, submission and tracking.
///
/// Holds no per-bundle state, so one pipeline can drive many bundles
/// concurrently over the same relay connection.
#[derive(Clone)]
pub struct BundlePipeline {
    selector: TipAccountSelector,
    submitter: BundleSubmitter,
    tracker: Arc<dyn StatusTracker>,
    max_transactions: usize,
}

impl BundlePipeline {
    pub fn new(
        relay: Arc<dyn BundleRelay>,
        encoding: TxEncoding,
        tracker: Arc<dyn StatusTracker>,
        max_transactions: usize,
    ) -> Self {
        Self {
            selector: TipAccountSelector::new(relay.clone()),
            submitter: BundleSubmitter::new(relay, encoding),
            tracker,
            max_transactions,
        }
    }

    /// Tip account for the caller to pay when signing the next bundle
    pub async fn select_tip_account(&self) -> Result<TipAccount> {
        self.selector.select_tip_account().await
    }

    /// Assemble, submit and track one set of signed transactions.
    ///
    /// A designated tip transaction is checked against the relay's current
    /// tip accounts before anything is sent.
    pub async fn run(&self, transactions: Vec<SignedTransaction>) -> Result<TrackingOutcome> {
        let bundle = if transactions.iter().any(SignedTransaction::is_tip) {
            let tip_accounts = self.selector.fetch_tip_accounts().await?;
            BundleAssembler::assemble_with_tips(transactions, self.max_transactions, &tip_accounts)?
        } else {
            tracing::warn!("No tip transaction designated; the relay is likely to drop this bundle");
            BundleAssembler::assemble(transactions, self.max_transactions)?
        };

        let handle = self.submitter.submit(&bundle).await?;
        self.track(&handle).await
    }

    /// Follow a handle that was already submitted
    pub async fn track(&self, handle: &BundleHandle) -> Result<TrackingOutcome> {
        tracing::info!(bundle_id = %handle, strategy = %self.tracker.name(), "Tracking bundle");
        self.tracker.track(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedRelay, TIP_ACCOUNTS};
    use crate::PollTracker;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use types::{BundlerError, OutcomeKind};

    fn pipeline(relay: &Arc<ScriptedRelay>) -> BundlePipeline {
        let tracker = Arc::new(PollTracker::new(relay.clone(), Duration::from_secs(1), 5));
        BundlePipeline::new(relay.clone(), TxEncoding::Base58, tracker, 5)
    }

    fn signed(tip_account: &str) -> Vec<SignedTransaction> {
        vec![
            SignedTransaction::new(vec![1; 16]),
            SignedTransaction::tip(vec![2; 16], tip_account.parse().unwrap()),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_lands_bundle() {
        let relay = Arc::new(ScriptedRelay::new().with_statuses(&["Pending", "Landed"]));
        let pipeline = pipeline(&relay);

        let outcome = pipeline.run(signed(TIP_ACCOUNTS[1])).await.unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::Landed);
        assert_eq!(relay.sent.lock().unwrap().len(), 1);
        assert_eq!(relay.tip_queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_tip_account_is_never_sent() {
        let relay = Arc::new(ScriptedRelay::new().with_tip_accounts(&TIP_ACCOUNTS[..1]));
        let pipeline = pipeline(&relay);

        let err = pipeline.run(signed(TIP_ACCOUNTS[2])).await.unwrap_err();

        assert!(matches!(err, BundlerError::Configuration(_)));
        assert!(relay.sent.lock().unwrap().is_empty());
        assert_eq!(relay.inflight_queries(), 0);
    }

    #[tokio::test]
    async fn test_oversized_bundle_makes_no_network_call() {
        let relay = Arc::new(ScriptedRelay::new());
        let pipeline = pipeline(&relay);

        let txs = (0..6).map(|i| SignedTransaction::new(vec![i; 4])).collect();
        let err = pipeline.run(txs).await.unwrap_err();

        assert!(matches!(err, BundlerError::BundleTooLarge { .. }));
        assert!(relay.sent.lock().unwrap().is_empty());
        assert_eq!(relay.tip_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_bundles_track_independently() {
        let relay = Arc::new(ScriptedRelay::new().with_fallback_status("Pending"));
        let pipeline = pipeline(&relay);

        let first = BundleHandle::new("bundle-a");
        let second = BundleHandle::new("bundle-b");
        let (a, b) = tokio::join!(pipeline.track(&first), pipeline.track(&second));

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.handle(), &first);
        assert_eq!(b.handle(), &second);
        assert_eq!(a.kind(), OutcomeKind::TimedOut);
        assert_eq!(b.kind(), OutcomeKind::TimedOut);
        assert_eq!(relay.inflight_queries(), 10);
    }
}
