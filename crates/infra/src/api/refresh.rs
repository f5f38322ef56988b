//! Single-flight token refresh coordination
//!
//! At most one refresh runs per client. The first caller to [`join`] becomes
//! the leader and receives a [`RefreshFlight`]; everyone else, including the
//! leader itself, waits on a oneshot receiver. Settling the flight broadcasts
//! one outcome to every waiter in the order they joined.
//!
//! [`join`]: RefreshCoordinator::join

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::errors::ApiError;

/// Result of a refresh: the new access token or the error every waiter sees
pub type RefreshOutcome = Result<String, ApiError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<Waiter>,
}

/// Tracks the in-flight refresh and the requests queued behind it
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register interest in a refresh.
    ///
    /// Returns a flight handle when the caller must start the refresh, plus the
    /// receiver its outcome will arrive on. The check-and-set happens under one
    /// lock acquisition.
    pub fn join(self: &Arc<Self>) -> (Option<RefreshFlight>, oneshot::Receiver<RefreshOutcome>) {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();
        state.waiters.push_back(tx);

        if state.in_flight {
            debug!(queued = state.waiters.len(), "request queued behind in-flight refresh");
            return (None, rx);
        }

        state.in_flight = true;
        debug!("starting token refresh");
        (Some(RefreshFlight { coordinator: Arc::clone(self), settled: false }), rx)
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Number of callers waiting on the current refresh
    pub fn pending(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        debug!(waiters = waiters.len(), success = outcome.is_ok(), "settling token refresh");
        for waiter in waiters {
            // A waiter whose caller went away is not an error
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Ownership of the in-flight refresh
///
/// Dropping the flight without settling it rejects every waiter, so the
/// in-flight flag is cleared on every exit path.
#[must_use = "an unsettled flight rejects its waiters when dropped"]
pub struct RefreshFlight {
    coordinator: Arc<RefreshCoordinator>,
    settled: bool,
}

impl RefreshFlight {
    /// Deliver `outcome` to every waiter and clear the in-flight flag.
    pub fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(&outcome);
    }
}

impl Drop for RefreshFlight {
    fn drop(&mut self) {
        if !self.settled {
            warn!("token refresh abandoned before completion");
            self.coordinator
                .settle(&Err(ApiError::RefreshInvalid("refresh abandoned".to_string())));
        }
    }
}
