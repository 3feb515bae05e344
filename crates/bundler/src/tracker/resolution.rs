//! Single-resolution guard for one tracked bundle

use types::{BundleHandle, OutcomeKind, TrackingOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Waiting,
    Resolved(OutcomeKind),
}

/// Owned exclusively by one tracking operation. The first terminal outcome
/// passes through; every later one is counted and dropped.
#[derive(Debug)]
pub struct ResolutionGuard {
    handle: BundleHandle,
    state: ResolutionState,
    resolutions: u32,
    ignored: u32,
}

impl ResolutionGuard {
    pub fn new(handle: BundleHandle) -> Self {
        Self {
            handle,
            state: ResolutionState::Waiting,
            resolutions: 0,
            ignored: 0,
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Returns the outcome on the first call only
    pub fn resolve(&mut self, outcome: TrackingOutcome) -> Option<TrackingOutcome> {
        match self.state {
            ResolutionState::Waiting => {
                self.state = ResolutionState::Resolved(outcome.kind());
                self.resolutions += 1;
                Some(outcome)
            }
            ResolutionState::Resolved(kind) => {
                self.ignore();
                tracing::debug!(
                    bundle_id = %self.handle,
                    resolved_as = ?kind,
                    late = ?outcome.kind(),
                    "Ignoring outcome after resolution"
                );
                None
            }
        }
    }

    /// Record a non-terminal event that arrived after resolution
    pub fn ignore(&mut self) {
        self.ignored += 1;
    }

    pub fn resolutions(&self) -> u32 {
        self.resolutions
    }

    pub fn ignored(&self) -> u32 {
        self.ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_outcome_wins() {
        let handle = BundleHandle::new("b1");
        let mut guard = ResolutionGuard::new(handle.clone());
        assert_eq!(guard.state(), ResolutionState::Waiting);

        let first = guard.resolve(TrackingOutcome::failed(handle.clone(), None));
        assert!(first.is_some());
        assert_eq!(guard.state(), ResolutionState::Resolved(OutcomeKind::Failed));

        let second = guard.resolve(TrackingOutcome::timed_out(handle, Duration::from_secs(1), None));
        assert!(second.is_none());
        assert_eq!(guard.state(), ResolutionState::Resolved(OutcomeKind::Failed));
        assert_eq!(guard.resolutions(), 1);
        assert_eq!(guard.ignored(), 1);
    }
}
