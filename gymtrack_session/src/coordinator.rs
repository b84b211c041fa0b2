//! Single-flight coordination of credential refreshes
//!
//! Any number of requests may discover an expired credential at the same
//! time. The coordinator collapses them into one refresh attempt: the first
//! caller becomes the leader and performs the refresh, everyone else suspends
//! on a waiter and is settled with the leader's outcome, in arrival order.
//!
//! The coordinator is transport-agnostic. It never performs a refresh itself;
//! it only decides who does and distributes the result.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::AccessToken;

type Outcome<E> = Result<AccessToken, RefreshFailed<E>>;

/// Coordinates concurrent refresh attempts into a single in-flight call
///
/// One coordinator instance is shared by every client that participates in
/// the same session, so a failure observed by any of them blocks and later
/// unblocks all of them.
pub struct RefreshCoordinator<E> {
    state: Mutex<State<E>>,
}

// Invariant: `waiters` is non-empty only while `refreshing` is true. Both
// fields change together under the one lock.
struct State<E> {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<Outcome<E>>>,
}

/// The role assigned to a caller that wants a fresh credential
#[must_use = "a leader that never settles strands every waiter until its guard drops"]
pub enum RefreshTicket<'a, E> {
    /// No refresh was in flight; the caller must perform it and settle
    Leader(RefreshGuard<'a, E>),
    /// A refresh is already in flight; the caller awaits its outcome
    Waiter(RefreshWaiter<E>),
}

/// Exclusive permission to perform the one in-flight refresh
///
/// Settle with [`complete`][Self::complete]. Dropping the guard without
/// settling wakes every waiter with [`RefreshFailed::Abandoned`] so that no
/// caller can be stranded.
pub struct RefreshGuard<'a, E> {
    coordinator: &'a RefreshCoordinator<E>,
    settled: bool,
}

/// A suspended caller awaiting the outcome of the in-flight refresh
pub struct RefreshWaiter<E> {
    rx: oneshot::Receiver<Outcome<E>>,
}

/// Why a caller did not receive a fresh credential
#[derive(Debug, Error)]
pub enum RefreshFailed<E> {
    /// The refresh call itself failed
    #[error(transparent)]
    Refresh(E),
    /// The leader went away without settling the attempt
    #[error("the refresh attempt was abandoned before it settled")]
    Abandoned,
}

impl<E: Clone> Clone for RefreshFailed<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Refresh(e) => Self::Refresh(e.clone()),
            Self::Abandoned => Self::Abandoned,
        }
    }
}

impl<E> RefreshCoordinator<E> {
    /// Constructs an idle coordinator
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                refreshing: false,
                waiters: Vec::new(),
            }),
        }
    }

    /// Joins the current refresh attempt, starting one if none is in flight
    ///
    /// The check of the in-flight flag and its transition happen in one
    /// critical section, so exactly one caller per attempt becomes the
    /// leader no matter how many arrive concurrently.
    pub fn acquire(&self) -> RefreshTicket<'_, E> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            tracing::trace!(
                queued = state.waiters.len(),
                "refresh already in flight, queued as waiter"
            );
            RefreshTicket::Waiter(RefreshWaiter { rx })
        } else {
            state.refreshing = true;
            RefreshTicket::Leader(RefreshGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Reports whether a refresh attempt is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    // Clears the in-flight flag and drains the queue in one critical section,
    // then wakes the waiters outside of it, strictly in arrival order.
    fn settle_with(&self, outcome: impl Fn() -> Outcome<E>) {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        tracing::debug!(waiters = waiters.len(), "refresh settled, waking waiters");
        for tx in waiters {
            if tx.send(outcome()).is_err() {
                tracing::trace!("a refresh waiter went away before the outcome arrived");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for RefreshCoordinator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for RefreshCoordinator<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &state.refreshing)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl<E: Clone> RefreshGuard<'_, E> {
    /// Settles the attempt, waking every waiter with a copy of the outcome
    pub fn complete(mut self, outcome: Result<AccessToken, E>) {
        self.settled = true;
        self.coordinator
            .settle_with(|| outcome.clone().map_err(RefreshFailed::Refresh));
    }
}

impl<E> Drop for RefreshGuard<'_, E> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("refresh guard dropped without settling, failing all waiters");
            self.coordinator.settle_with(|| Err(RefreshFailed::Abandoned));
        }
    }
}

impl<E> fmt::Debug for RefreshGuard<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RefreshGuard")
            .field("settled", &self.settled)
            .finish()
    }
}

impl<E> RefreshWaiter<E> {
    /// Suspends until the in-flight refresh settles
    ///
    /// There is no timeout of its own; the wait is bounded by the leader's
    /// own request timeout plus the abandonment guarantee of
    /// [`RefreshGuard`].
    pub async fn wait(self) -> Outcome<E> {
        match self.rx.await {
            Ok(outcome) => outcome,
            // The guard settles on drop, so this only fires if the whole
            // coordinator was torn down mid-flight.
            Err(_) => Err(RefreshFailed::Abandoned),
        }
    }
}

impl<E> fmt::Debug for RefreshWaiter<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RefreshWaiter").finish_non_exhaustive()
    }
}

impl<E> fmt::Debug for RefreshTicket<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Leader(guard) => f.debug_tuple("Leader").field(guard).finish(),
            Self::Waiter(waiter) => f.debug_tuple("Waiter").field(waiter).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Debug, Error, PartialEq)]
    #[error("refresh went sideways")]
    struct TestError;

    fn leader<'a>(
        coordinator: &'a RefreshCoordinator<TestError>,
    ) -> RefreshGuard<'a, TestError> {
        match coordinator.acquire() {
            RefreshTicket::Leader(guard) => guard,
            RefreshTicket::Waiter(_) => panic!("expected to lead"),
        }
    }

    fn waiter(coordinator: &RefreshCoordinator<TestError>) -> RefreshWaiter<TestError> {
        match coordinator.acquire() {
            RefreshTicket::Waiter(waiter) => waiter,
            RefreshTicket::Leader(_) => panic!("expected to wait"),
        }
    }

    #[tokio::test]
    async fn only_one_leader_per_attempt() {
        let coordinator = RefreshCoordinator::<TestError>::new();

        let guard = leader(&coordinator);
        assert!(coordinator.is_refreshing());
        let w1 = waiter(&coordinator);
        let w2 = waiter(&coordinator);

        guard.complete(Ok(AccessToken::from("fresh")));
        assert!(!coordinator.is_refreshing());

        assert_eq!(w1.wait().await.unwrap().as_str(), "fresh");
        assert_eq!(w2.wait().await.unwrap().as_str(), "fresh");

        // once settled, the next caller leads a brand new attempt
        let _next = leader(&coordinator);
    }

    #[tokio::test]
    async fn failure_settles_every_waiter_with_the_same_error() {
        let coordinator = RefreshCoordinator::new();

        let guard = leader(&coordinator);
        let w1 = waiter(&coordinator);
        let w2 = waiter(&coordinator);

        guard.complete(Err(TestError));

        for w in [w1, w2] {
            match w.wait().await {
                Err(RefreshFailed::Refresh(e)) => assert_eq!(e, TestError),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn dropped_guard_abandons_waiters() {
        let coordinator = RefreshCoordinator::<TestError>::new();

        let guard = leader(&coordinator);
        let w = waiter(&coordinator);
        drop(guard);

        assert!(matches!(w.wait().await, Err(RefreshFailed::Abandoned)));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn waiters_wake_in_arrival_order() {
        let coordinator = Arc::new(RefreshCoordinator::<TestError>::new());
        let guard_holder = Arc::clone(&coordinator);

        let guard = match guard_holder.acquire() {
            RefreshTicket::Leader(guard) => guard,
            RefreshTicket::Waiter(_) => panic!("expected to lead"),
        };

        let (order_tx, mut order_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut handles = Vec::new();
        for idx in 0..3usize {
            let coordinator = Arc::clone(&coordinator);
            let order_tx = order_tx.clone();
            handles.push(tokio::spawn(async move {
                let w = match coordinator.acquire() {
                    RefreshTicket::Waiter(w) => w,
                    RefreshTicket::Leader(_) => panic!("expected to wait"),
                };
                w.wait().await.unwrap();
                order_tx.send(idx).unwrap();
            }));
            // park this waiter on the queue before spawning the next
            tokio::task::yield_now().await;
        }

        guard.complete(Ok(AccessToken::from("fresh")));
        for handle in handles {
            handle.await.unwrap();
        }

        let mut order = Vec::new();
        while let Ok(idx) = order_rx.try_recv() {
            order.push(idx);
        }
        assert_eq!(order, vec![0, 1, 2]);
    }
}
