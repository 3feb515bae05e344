//! Poll-based tracking over `getInflightBundleStatuses`

use super::{log_outcome, StatusTracker};
use async_trait::async_trait;
use chrono::Utc;
use config::TrackingConfig;
use relay_client::BundleRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use types::{BundleHandle, BundleStatus, LandedBundle, Result, TrackingOutcome};

/// Queries inflight status on a fixed interval, at most `max_attempts` times.
///
/// Worst case wait is `interval * max_attempts`. A failed status query counts
/// as an attempt that observed nothing; it is never re-issued early.
#[derive(Clone)]
pub struct PollTracker {
    relay: Arc<dyn BundleRelay>,
    interval: Duration,
    max_attempts: u32,
}

impl PollTracker {
    pub fn new(relay: Arc<dyn BundleRelay>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            relay,
            interval,
            max_attempts,
        }
    }

    pub fn from_config(relay: Arc<dyn BundleRelay>, config: &TrackingConfig) -> Self {
        Self::new(relay, config.poll_interval(), config.max_poll_attempts)
    }

    async fn observe(&self, handle: &BundleHandle, attempt: u32) -> (BundleStatus, Option<u64>) {
        match self.relay.get_inflight_bundle_status(handle).await {
            Ok(Some(entry)) => (BundleStatus::from_wire(&entry.status), entry.landed_slot),
            Ok(None) => (BundleStatus::Unknown, None),
            Err(e) => {
                tracing::warn!(
                    relay = %self.relay.name(),
                    bundle_id = %handle,
                    attempt,
                    error = %e,
                    "Inflight status query failed"
                );
                (BundleStatus::Unknown, None)
            }
        }
    }

    /// One `getBundleStatuses` call for the landed signatures
    async fn confirm_landed(&self, handle: &BundleHandle, landed_slot: Option<u64>) -> LandedBundle {
        let (transactions, slot) = match self.relay.get_bundle_status(handle).await {
            Ok(Some(finalized)) => (finalized.transactions, landed_slot.or(finalized.slot)),
            Ok(None) => {
                tracing::warn!(bundle_id = %handle, "Landed bundle has no finalized status yet");
                (Vec::new(), landed_slot)
            }
            Err(e) => {
                tracing::warn!(bundle_id = %handle, error = %e, "Finalized status query failed");
                (Vec::new(), landed_slot)
            }
        };

        LandedBundle {
            handle: handle.clone(),
            landed_slot: slot,
            transactions,
            resolved_at: Utc::now(),
        }
    }
}

#[async_trait]
impl StatusTracker for PollTracker {
    fn name(&self) -> &str {
        "poll"
    }

    async fn track(&self, handle: &BundleHandle) -> Result<TrackingOutcome> {
        let started = Instant::now();

        for attempt in 1..=self.max_attempts {
            let (status, landed_slot) = self.observe(handle, attempt).await;

            let outcome = match status {
                BundleStatus::Failed => Some(TrackingOutcome::failed(
                    handle.clone(),
                    Some(format!("relay reported Failed on attempt {}", attempt)),
                )),
                BundleStatus::Landed => Some(TrackingOutcome::Landed(
                    self.confirm_landed(handle, landed_slot).await,
                )),
                BundleStatus::Pending | BundleStatus::Unknown => {
                    tracing::debug!(
                        bundle_id = %handle,
                        attempt,
                        max_attempts = self.max_attempts,
                        status = %status,
                        "Bundle not terminal yet"
                    );
                    None
                }
            };

            if let Some(outcome) = outcome {
                log_outcome(self.name(), &outcome);
                return Ok(outcome);
            }

            if attempt < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        let outcome =
            TrackingOutcome::timed_out(handle.clone(), started.elapsed(), Some(self.max_attempts));
        log_outcome(self.name(), &outcome);
        Ok(outcome)
    }
}
