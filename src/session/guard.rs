//! UI-side handling of session invalidation
//!
//! [`SessionGuard`] listens to the [`SessionEvent`]s an [`ApiClient`]
//! publishes. For every invalidation it shows the "Session Expired" notice,
//! waits for the user to acknowledge it, then runs the logout callback.
//! Invalidations that pile up while the notice is open (a burst of
//! concurrent 401s) are folded into that one notice.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::error::SESSION_EXPIRED_MESSAGE;
use crate::session::{LogoutSlot, SessionEvent};
use crate::storage::SessionStore;

/// Presents the blocking session-expired notice
#[async_trait::async_trait]
pub trait SessionNotice: Send + Sync {
    /// Show the notice; resolve once the user has acknowledged it
    async fn session_expired(&self);
}

/// Headless notice: logs the message and acknowledges immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotice;

#[async_trait::async_trait]
impl SessionNotice for LoggingNotice {
    async fn session_expired(&self) {
        tracing::warn!("{}", SESSION_EXPIRED_MESSAGE);
    }
}

/// Background subscriber that turns invalidations into a logout
///
/// Dropping the guard stops it. [`SessionGuard::shutdown`] first handles
/// any invalidation already queued, so a 401 that ends the caller's work
/// still reaches the notice and the logout callback.
#[derive(Debug)]
pub struct SessionGuard {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionGuard {
    /// Start guarding the sessions of `client`
    ///
    /// The client's store settles whether missed events could have hidden
    /// an invalidation: while a token is stored, nothing was invalidated.
    pub fn attach(client: &ApiClient, notice: Arc<dyn SessionNotice>, slot: LogoutSlot) -> Self {
        Self::start(
            client.subscribe_session_events(),
            Some(Arc::clone(client.store())),
            notice,
            slot,
        )
    }

    /// Start guarding an arbitrary event receiver
    ///
    /// Without a store, missed events are assumed to include an
    /// invalidation.
    pub fn spawn(
        events: broadcast::Receiver<SessionEvent>,
        notice: Arc<dyn SessionNotice>,
        slot: LogoutSlot,
    ) -> Self {
        Self::start(events, None, notice, slot)
    }

    fn start(
        events: broadcast::Receiver<SessionEvent>,
        store: Option<Arc<SessionStore>>,
        notice: Arc<dyn SessionNotice>,
        slot: LogoutSlot,
    ) -> Self {
        let cancel = CancellationToken::new();
        let guard = Guard {
            events,
            store,
            notice,
            slot,
        };
        let task = tokio::spawn(guard.run(cancel.clone()));
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Handle queued events, stop the guard and wait for it to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Guard {
    events: broadcast::Receiver<SessionEvent>,
    store: Option<Arc<SessionStore>>,
    notice: Arc<dyn SessionNotice>,
    slot: LogoutSlot,
}

impl Guard {
    async fn run(mut self, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    if self.take_pending() {
                        self.expire().await;
                    }
                    break;
                }
                event = self.events.recv() => event,
            };

            let expired = match event {
                Ok(SessionEvent::Invalidated { path, at }) => {
                    tracing::info!(path = %path, at = %at, "Session invalidated by backend");
                    true
                }
                Ok(SessionEvent::LoggedOut) => false,
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "Session guard lagged");
                    self.lag_hid_invalidation()
                }
                Err(RecvError::Closed) => break,
            };

            if expired {
                self.expire().await;
            }
        }
    }

    /// Show the notice, fold whatever queued up meanwhile, then log out
    async fn expire(&mut self) {
        self.notice.session_expired().await;
        self.take_pending();
        self.slot.invoke();
    }

    /// Empty the queue; true if it held an invalidation
    fn take_pending(&mut self) -> bool {
        let mut expired = false;
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Invalidated { .. }) => expired = true,
                Ok(SessionEvent::LoggedOut) => {}
                Err(TryRecvError::Lagged(_)) => {
                    expired = expired || self.lag_hid_invalidation();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        expired
    }

    /// Invalidation clears the token before it is published, so a stored
    /// token means none of the missed events was one.
    fn lag_hid_invalidation(&self) -> bool {
        match &self.store {
            Some(store) => !matches!(store.token(), Ok(Some(_))),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingNotice {
        shown: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SessionNotice for CountingNotice {
        async fn session_expired(&self) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn invalidated() -> SessionEvent {
        SessionEvent::Invalidated {
            path: "/api/my-properties".to_string(),
            at: Utc::now(),
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_invalidation_shows_notice_then_logs_out() {
        let (tx, rx) = broadcast::channel(16);
        let notice = Arc::new(CountingNotice::default());
        let slot = LogoutSlot::new();
        let logouts = Arc::new(AtomicUsize::new(0));
        let l = Arc::clone(&logouts);
        slot.register(move || {
            l.fetch_add(1, Ordering::SeqCst);
        });

        let guard = SessionGuard::spawn(rx, notice.clone(), slot);
        tx.send(invalidated()).unwrap();

        wait_until(|| logouts.load(Ordering::SeqCst) == 1).await;
        assert_eq!(notice.shown.load(Ordering::SeqCst), 1);
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
        guard.shutdown().await;
    }

    #[tokio::test]
    async fn test_logged_out_event_is_ignored() {
        let (tx, rx) = broadcast::channel(16);
        let notice = Arc::new(CountingNotice::default());
        let guard = SessionGuard::spawn(rx, notice.clone(), LogoutSlot::new());

        tx.send(SessionEvent::LoggedOut).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(notice.shown.load(Ordering::SeqCst), 0);
        guard.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalidation_without_registered_callback_is_harmless() {
        let (tx, rx) = broadcast::channel(16);
        let notice = Arc::new(CountingNotice::default());
        let guard = SessionGuard::spawn(rx, notice.clone(), LogoutSlot::new());

        tx.send(invalidated()).unwrap();
        wait_until(|| notice.shown.load(Ordering::SeqCst) == 1).await;

        assert_eq!(notice.shown.load(Ordering::SeqCst), 1);
        guard.shutdown().await;
    }

    #[tokio::test]
    async fn test_burst_queued_before_start_is_coalesced() {
        let (tx, rx) = broadcast::channel(16);
        for _ in 0..5 {
            tx.send(invalidated()).unwrap();
        }

        let notice = Arc::new(CountingNotice::default());
        let guard = SessionGuard::spawn(rx, notice.clone(), LogoutSlot::new());
        wait_until(|| notice.shown.load(Ordering::SeqCst) >= 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(notice.shown.load(Ordering::SeqCst), 1);
        guard.shutdown().await;
    }

    fn store_with_token(token: Option<&str>) -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
        if let Some(token) = token {
            store.set_token(token).unwrap();
        }
        store
    }

    fn counting_slot() -> (LogoutSlot, Arc<AtomicUsize>) {
        let slot = LogoutSlot::new();
        let logouts = Arc::new(AtomicUsize::new(0));
        let l = Arc::clone(&logouts);
        slot.register(move || {
            l.fetch_add(1, Ordering::SeqCst);
        });
        (slot, logouts)
    }

    #[tokio::test]
    async fn test_shutdown_handles_queued_invalidation() {
        let (tx, rx) = broadcast::channel(16);
        let notice = Arc::new(CountingNotice::default());
        let (slot, logouts) = counting_slot();

        let guard = SessionGuard::spawn(rx, notice.clone(), slot);
        tx.send(invalidated()).unwrap();
        guard.shutdown().await;

        assert_eq!(notice.shown.load(Ordering::SeqCst), 1);
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lag_over_logouts_keeps_live_session() {
        let (tx, rx) = broadcast::channel(1);
        for _ in 0..3 {
            tx.send(SessionEvent::LoggedOut).unwrap();
        }

        let notice = Arc::new(CountingNotice::default());
        let (slot, logouts) = counting_slot();
        let store = store_with_token(Some("abc123"));
        let guard = SessionGuard::start(rx, Some(store), notice.clone(), slot);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(notice.shown.load(Ordering::SeqCst), 0);
        assert_eq!(logouts.load(Ordering::SeqCst), 0);
        guard.shutdown().await;
        assert_eq!(logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lag_with_cleared_token_logs_out() {
        let (tx, rx) = broadcast::channel(1);
        for _ in 0..3 {
            tx.send(invalidated()).unwrap();
        }

        let notice = Arc::new(CountingNotice::default());
        let (slot, logouts) = counting_slot();
        let guard = SessionGuard::start(rx, Some(store_with_token(None)), notice.clone(), slot);
        wait_until(|| logouts.load(Ordering::SeqCst) == 1).await;

        assert_eq!(notice.shown.load(Ordering::SeqCst), 1);
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
        guard.shutdown().await;
    }
}
