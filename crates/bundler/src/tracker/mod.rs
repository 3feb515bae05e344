//! Following submitted bundles to a terminal outcome

pub mod event;
pub mod poll;
pub mod resolution;

pub use event::EventTracker;
pub use poll::PollTracker;
pub use resolution::{ResolutionGuard, ResolutionState};

use async_trait::async_trait;
use config::{TrackingConfig, TrackingStrategy};
use relay_client::{BundleEventSource, BundleRelay};
use std::sync::Arc;
use types::{BundleHandle, BundlerError, Result, TrackingOutcome};

/// Tracks one bundle handle until it lands, fails, or the wait budget runs out.
///
/// Implementations resolve at most once per call and always return within a
/// bounded time. `Err` is reserved for failures to start tracking; relay
/// outcomes, including timeouts, come back as a [`TrackingOutcome`].
#[async_trait]
pub trait StatusTracker: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &str;

    async fn track(&self, handle: &BundleHandle) -> Result<TrackingOutcome>;
}

/// Build the tracker selected by `tracking.strategy`
pub fn build_tracker(
    config: &TrackingConfig,
    relay: Arc<dyn BundleRelay>,
    events: Option<Arc<dyn BundleEventSource>>,
) -> Result<Arc<dyn StatusTracker>> {
    match config.strategy {
        TrackingStrategy::Poll => Ok(Arc::new(PollTracker::from_config(relay, config))),
        TrackingStrategy::Event => {
            let events = events.ok_or_else(|| {
                BundlerError::Configuration(
                    "event tracking requires a bundle result stream".to_string(),
                )
            })?;
            Ok(Arc::new(EventTracker::new(events, config.event_timeout())))
        }
    }
}

pub(crate) fn log_outcome(strategy: &str, outcome: &TrackingOutcome) {
    match outcome {
        TrackingOutcome::Landed(landed) => tracing::info!(
            strategy,
            bundle_id = %landed.handle,
            landed_slot = landed.landed_slot,
            signatures = landed.transactions.len(),
            "Bundle landed"
        ),
        TrackingOutcome::Failed { handle, reason, .. } => tracing::error!(
            strategy,
            bundle_id = %handle,
            reason = reason.as_deref().unwrap_or("not reported"),
            "Bundle failed"
        ),
        TrackingOutcome::TimedOut {
            handle,
            waited_ms,
            attempts,
            ..
        } => tracing::warn!(
            strategy,
            bundle_id = %handle,
            waited_ms,
            attempts,
            "Tracking timed out, outcome unknown; reconcile out of band"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualEvents, ScriptedRelay};

    #[test]
    fn test_build_tracker_follows_strategy() {
        let relay: Arc<dyn BundleRelay> = Arc::new(ScriptedRelay::new());
        let events: Arc<dyn BundleEventSource> = Arc::new(ManualEvents::default());

        let mut config = TrackingConfig::default();
        let tracker = build_tracker(&config, relay.clone(), None).unwrap();
        assert_eq!(tracker.name(), "poll");

        config.strategy = TrackingStrategy::Event;
        let tracker = build_tracker(&config, relay.clone(), Some(events)).unwrap();
        assert_eq!(tracker.name(), "event");

        let err = build_tracker(&config, relay, None).err().unwrap();
        assert!(matches!(err, BundlerError::Configuration(_)));
    }
}
