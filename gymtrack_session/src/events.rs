//! Session lifecycle notifications
//!
//! The refresh flow must be able to declare the session dead (refresh itself
//! was rejected) without knowing anything about navigation or UI. This module
//! is that seam: the refresher publishes, the embedding application
//! subscribes and decides what "send the user back to login" means for it.

use std::sync::Arc;

use tokio::sync::watch;

/// Whether the current session is still usable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// The session is live; requests may succeed
    Active,
    /// The session is beyond recovery; a new login is required
    Expired,
}

/// A broadcast point for session lifecycle changes
///
/// Cloning is cheap; all clones publish to the same subscribers. Delivery is
/// best-effort by design: losing a notification only delays the UI redirect,
/// it never affects the refresh protocol itself.
#[derive(Clone, Debug)]
pub struct SessionEvents {
    tx: Arc<watch::Sender<SessionStatus>>,
}

impl SessionEvents {
    /// Creates a new event source reporting an active session
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionStatus::Active);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribes to session status changes
    ///
    /// The receiver immediately observes the current status.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.tx.subscribe()
    }

    /// The current session status
    pub fn status(&self) -> SessionStatus {
        *self.tx.borrow()
    }

    /// Declares the session expired
    pub fn expire(&self) {
        tracing::warn!("session expired, a new login is required");
        self.tx.send_replace(SessionStatus::Expired);
    }

    /// Declares the session active again, after a fresh login
    pub fn reset(&self) {
        self.tx.send_replace(SessionStatus::Active);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_expiry() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();
        assert_eq!(*rx.borrow(), SessionStatus::Active);

        events.expire();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionStatus::Expired);
        assert_eq!(events.status(), SessionStatus::Expired);
    }

    #[test]
    fn clones_share_the_same_channel() {
        let events = SessionEvents::new();
        let observer = events.clone();
        events.expire();
        assert_eq!(observer.status(), SessionStatus::Expired);
    }
}
