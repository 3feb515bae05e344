//! Event-driven tracking over the bundle result stream

use super::{log_outcome, ResolutionGuard, StatusTracker};
use async_trait::async_trait;
use chrono::Utc;
use relay_client::{BundleEventSource, BundleSubscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use types::{BundleEvent, BundleHandle, LandedBundle, Result, TrackingOutcome};

/// Waits for an accepted result on the stream, bounded by a wall-clock timer.
///
/// Rejections and transport errors are logged and waiting continues: one
/// relay replica rejecting the bundle does not mean it failed overall.
/// Only acceptance or the timer resolves tracking.
#[derive(Clone)]
pub struct EventTracker {
    events: Arc<dyn BundleEventSource>,
    timeout: Duration,
}

impl EventTracker {
    pub fn new(events: Arc<dyn BundleEventSource>, timeout: Duration) -> Self {
        Self { events, timeout }
    }

    /// Drive one subscription to resolution, then drain anything already
    /// queued behind the resolving event
    pub(crate) async fn run(
        &self,
        handle: &BundleHandle,
        mut subscription: BundleSubscription,
    ) -> (TrackingOutcome, ResolutionGuard) {
        let started = Instant::now();
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);

        let mut guard = ResolutionGuard::new(handle.clone());
        let mut channel_open = true;

        let outcome = loop {
            let candidate = tokio::select! {
                biased;

                event = subscription.recv(), if channel_open => match event {
                    Some(event) => self.on_event(handle, event),
                    None => {
                        tracing::warn!(
                            source = %self.events.name(),
                            bundle_id = %handle,
                            "Bundle result channel closed, waiting for deadline"
                        );
                        channel_open = false;
                        None
                    }
                },
                _ = &mut deadline => Some(TrackingOutcome::timed_out(
                    handle.clone(),
                    started.elapsed(),
                    None,
                )),
            };

            if let Some(outcome) = candidate.and_then(|c| guard.resolve(c)) {
                break outcome;
            }
        };

        while let Ok(late) = subscription.try_recv() {
            match accepted_outcome(handle, late) {
                Some(outcome) => {
                    guard.resolve(outcome);
                }
                None => guard.ignore(),
            }
        }

        (outcome, guard)
    }

    fn on_event(&self, handle: &BundleHandle, event: BundleEvent) -> Option<TrackingOutcome> {
        match &event {
            BundleEvent::Accepted { slot, validator } => {
                tracing::debug!(
                    bundle_id = %handle,
                    slot = *slot,
                    validator = validator.as_deref().unwrap_or("unknown"),
                    "Bundle accepted"
                );
            }
            BundleEvent::Rejected { reason } => {
                tracing::warn!(bundle_id = %handle, reason = %reason, "Bundle rejected by a relay replica, still waiting");
            }
            BundleEvent::TransportError(message) => {
                tracing::warn!(
                    source = %self.events.name(),
                    bundle_id = %handle,
                    error = %message,
                    "Bundle result stream error, still waiting"
                );
            }
        }
        accepted_outcome(handle, event)
    }
}

fn accepted_outcome(handle: &BundleHandle, event: BundleEvent) -> Option<TrackingOutcome> {
    match event {
        BundleEvent::Accepted { slot, .. } => Some(TrackingOutcome::Landed(LandedBundle {
            handle: handle.clone(),
            landed_slot: slot,
            transactions: Vec::new(),
            resolved_at: Utc::now(),
        })),
        BundleEvent::Rejected { .. } | BundleEvent::TransportError(_) => None,
    }
}

#[async_trait]
impl StatusTracker for EventTracker {
    fn name(&self) -> &str {
        "event"
    }

    async fn track(&self, handle: &BundleHandle) -> Result<TrackingOutcome> {
        let subscription = self.events.subscribe(handle).await?;
        let (outcome, guard) = self.run(handle, subscription).await;

        if guard.ignored() > 0 {
            tracing::debug!(bundle_id = %handle, ignored = guard.ignored(), "Dropped events after resolution");
        }
        log_outcome(self.name(), &outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualEvents;
    use types::OutcomeKind;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn accepted(slot: u64) -> BundleEvent {
        BundleEvent::Accepted {
            slot: Some(slot),
            validator: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_resolves_once_and_later_events_are_ignored() {
        let events = Arc::new(ManualEvents::with_queued(vec![
            accepted(10),
            accepted(11),
            BundleEvent::Rejected {
                reason: "late".to_string(),
            },
        ]));
        let tracker = EventTracker::new(events.clone(), TIMEOUT);
        let handle = BundleHandle::new("bundle-1");

        let subscription = events.subscribe(&handle).await.unwrap();
        let (outcome, guard) = tracker.run(&handle, subscription).await;

        assert_eq!(guard.resolutions(), 1);
        assert_eq!(guard.ignored(), 2);
        match outcome {
            TrackingOutcome::Landed(landed) => assert_eq!(landed.landed_slot, Some(10)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_before_deadline_disarms_timer() {
        let events = Arc::new(ManualEvents::default());
        let tracker = EventTracker::new(events.clone(), TIMEOUT);
        let handle = BundleHandle::new("bundle-1");

        let subscription = events.subscribe(&handle).await.unwrap();
        let sender = events.sender(&handle).unwrap();
        tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            let _ = sender.send(accepted(42));
        });

        let started = Instant::now();
        let (outcome, guard) = tracker.run(&handle, subscription).await;

        assert_eq!(outcome.kind(), OutcomeKind::Landed);
        assert_eq!(guard.resolutions(), 1);
        assert!(started.elapsed() < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline_not_earlier() {
        let events = Arc::new(ManualEvents::default());
        let tracker = EventTracker::new(events.clone(), TIMEOUT);
        let handle = BundleHandle::new("bundle-1");

        let started = Instant::now();
        let outcome = tracker.track(&handle).await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= TIMEOUT, "{:?}", elapsed);
        assert!(elapsed < TIMEOUT + Duration::from_secs(1), "{:?}", elapsed);
        match outcome {
            TrackingOutcome::TimedOut { attempts, .. } => assert_eq!(attempts, None),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_and_transport_errors_do_not_resolve() {
        let events = Arc::new(ManualEvents::with_queued(vec![
            BundleEvent::Rejected {
                reason: "simulation failure".to_string(),
            },
            BundleEvent::TransportError("connection reset".to_string()),
        ]));
        let tracker = EventTracker::new(events.clone(), TIMEOUT);

        let started = Instant::now();
        let outcome = tracker.track(&BundleHandle::new("bundle-1")).await.unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::TimedOut);
        assert!(started.elapsed() >= TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_still_waits_for_deadline() {
        let events = Arc::new(ManualEvents::default());
        let tracker = EventTracker::new(events.clone(), TIMEOUT);
        let handle = BundleHandle::new("bundle-1");

        let (tx, subscription) = tokio::sync::mpsc::unbounded_channel();
        drop(tx);

        let started = Instant::now();
        let (outcome, _) = tracker.run(&handle, subscription).await;

        assert_eq!(outcome.kind(), OutcomeKind::TimedOut);
        assert!(started.elapsed() >= TIMEOUT);
    }
}
