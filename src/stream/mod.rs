//! Per-user notification event stream
//!
//! The stream is a long-lived WebSocket on the API host. After connecting,
//! the client joins the channel of one user and then receives
//! `notification_update` events for that user.
//!
//! - [`protocol`] -- frame encoding and decoding
//! - [`manager::StreamManager`] -- shares one connection per user between
//!   every subscriber, closing it when the last one leaves
//! - [`Subscription`] -- a subscriber's handle on the updates
//!
//! Consumers depend on the [`NotificationFeed`] trait so that tests can
//! feed updates without a socket.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::Result;

pub mod manager;
pub mod protocol;

pub use manager::StreamManager;
pub use protocol::{NotificationUpdate, UpdateKind};

/// Source of per-user notification updates
#[async_trait::async_trait]
pub trait NotificationFeed: Send + Sync {
    /// Start receiving updates for `user_id`
    ///
    /// The returned [`Subscription`] keeps the underlying connection alive
    /// until it is dropped.
    async fn subscribe(&self, user_id: &str) -> Result<Subscription>;
}

/// A live subscription to one user's updates
pub struct Subscription {
    // Field order is drop order: stop listening first, then release the
    // connection lease.
    updates: broadcast::Receiver<NotificationUpdate>,
    _lease: Option<manager::Lease>,
}

impl Subscription {
    /// Wrap a receiver that is not backed by a managed connection
    pub fn detached(updates: broadcast::Receiver<NotificationUpdate>) -> Self {
        Self {
            updates,
            _lease: None,
        }
    }

    pub(crate) fn leased(
        updates: broadcast::Receiver<NotificationUpdate>,
        lease: manager::Lease,
    ) -> Self {
        Self {
            updates,
            _lease: Some(lease),
        }
    }

    /// Next update in arrival order; `None` once the stream has ended
    ///
    /// If this subscriber fell behind, the skipped updates are logged and
    /// lost; the count stays stale until the next snapshot.
    pub async fn recv(&mut self) -> Option<NotificationUpdate> {
        loop {
            match self.updates.recv().await {
                Ok(update) => return Some(update),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Notification subscriber lagged; updates skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("managed", &self._lease.is_some())
            .finish()
    }
}
