//! Scripted relay fakes shared by the unit tests

use async_trait::async_trait;
use relay_client::{BundleEventSource, BundleRelay, BundleSubscription};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use types::{
    BundleEvent, BundleHandle, FinalizedBundleStatus, InflightBundleStatus, RelayError,
};

pub(crate) const TIP_ACCOUNTS: [&str; 3] = [
    "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
    "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
    "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
];

pub(crate) const LANDED_SIGNATURE: &str =
    "5Kt1Rr3kW4BCGx1dXUpqgMbZaM7uKmA4AovZB6xbzGZs8CydEHdV5wEJ7ZVMWsjuCMgkSvqiwVe7k4sV7EMoqf2t";

/// Relay that replays a fixed script of inflight statuses and counts calls
pub(crate) struct ScriptedRelay {
    tip_accounts: Vec<String>,
    statuses: Mutex<VecDeque<&'static str>>,
    fallback_status: &'static str,
    send_result: Mutex<Option<Result<BundleHandle, RelayError>>>,
    pub sent: Mutex<Vec<Vec<String>>>,
    pub tip_queries: AtomicU32,
    pub inflight_queries: AtomicU32,
    pub finalized_queries: AtomicU32,
}

impl ScriptedRelay {
    pub fn new() -> Self {
        Self {
            tip_accounts: TIP_ACCOUNTS.iter().map(|s| s.to_string()).collect(),
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: "Pending",
            send_result: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            tip_queries: AtomicU32::new(0),
            inflight_queries: AtomicU32::new(0),
            finalized_queries: AtomicU32::new(0),
        }
    }

    pub fn with_tip_accounts(mut self, accounts: &[&str]) -> Self {
        self.tip_accounts = accounts.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Statuses returned in order; `absent` yields no entry, `error` a transport error
    pub fn with_statuses(self, statuses: &[&'static str]) -> Self {
        *self.statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    /// Status returned once the script is exhausted
    pub fn with_fallback_status(mut self, status: &'static str) -> Self {
        self.fallback_status = status;
        self
    }

    pub fn with_send_result(self, result: Result<BundleHandle, RelayError>) -> Self {
        *self.send_result.lock().unwrap() = Some(result);
        self
    }

    pub fn inflight_queries(&self) -> u32 {
        self.inflight_queries.load(Ordering::SeqCst)
    }

    pub fn finalized_queries(&self) -> u32 {
        self.finalized_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundleRelay for ScriptedRelay {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_tip_accounts(&self) -> Result<Vec<String>, RelayError> {
        self.tip_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.tip_accounts.clone())
    }

    async fn send_bundle(&self, transactions: Vec<String>) -> Result<BundleHandle, RelayError> {
        self.sent.lock().unwrap().push(transactions);
        match self.send_result.lock().unwrap().clone() {
            Some(result) => result,
            None => Ok(BundleHandle::new("bundle-1")),
        }
    }

    async fn get_inflight_bundle_status(
        &self,
        handle: &BundleHandle,
    ) -> Result<Option<InflightBundleStatus>, RelayError> {
        self.inflight_queries.fetch_add(1, Ordering::SeqCst);
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback_status);

        match status {
            "absent" => Ok(None),
            "error" => Err(RelayError::Connection {
                relay: "scripted".to_string(),
                message: "connection reset".to_string(),
            }),
            status => Ok(Some(InflightBundleStatus {
                bundle_id: handle.to_string(),
                status: status.to_string(),
                landed_slot: (status == "Landed").then_some(280_000_000),
            })),
        }
    }

    async fn get_bundle_status(
        &self,
        handle: &BundleHandle,
    ) -> Result<Option<FinalizedBundleStatus>, RelayError> {
        self.finalized_queries.fetch_add(1, Ordering::SeqCst);
        Ok(Some(FinalizedBundleStatus {
            bundle_id: handle.to_string(),
            transactions: vec![LANDED_SIGNATURE.to_string()],
            slot: Some(280_000_000),
            confirmation_status: Some("confirmed".to_string()),
            err: None,
        }))
    }
}

/// Event source whose per-bundle channels are driven by the test
#[derive(Default)]
pub(crate) struct ManualEvents {
    senders: Mutex<Vec<(BundleHandle, mpsc::UnboundedSender<BundleEvent>)>>,
    queued: Mutex<Vec<BundleEvent>>,
}

impl ManualEvents {
    /// Events delivered as soon as a subscriber registers
    pub fn with_queued(events: Vec<BundleEvent>) -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
            queued: Mutex::new(events),
        }
    }

    pub fn sender(&self, handle: &BundleHandle) -> Option<mpsc::UnboundedSender<BundleEvent>> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, tx)| tx.clone())
    }
}

#[async_trait]
impl BundleEventSource for ManualEvents {
    fn name(&self) -> &str {
        "manual"
    }

    async fn subscribe(&self, handle: &BundleHandle) -> Result<BundleSubscription, RelayError> {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in self.queued.lock().unwrap().drain(..) {
            let _ = tx.send(event);
        }
        self.senders.lock().unwrap().push((handle.clone(), tx));
        Ok(rx)
    }
}
