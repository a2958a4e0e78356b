//! Badge lifecycle: mount, reconcile, unmount
//!
//! Mounting spawns one task that:
//!
//! 1. fetches the unread snapshot (failure leaves the count at 0 and ends
//!    the task quietly),
//! 2. publishes the snapshot count,
//! 3. subscribes to the user's channel, and only after the snapshot
//!    succeeded,
//! 4. applies updates in arrival order until unmounted.
//!
//! Unmounting cancels the task at whichever await it is parked on. A
//! snapshot that resolves after unmount is never applied and no
//! subscription is opened.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::notifications::apply_update;
use crate::stream::NotificationFeed;

/// A mounted unread-count badge
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use roomlet::api::ApiClient;
/// use roomlet::notifications::NotificationBadge;
/// use roomlet::stream::StreamManager;
///
/// # async fn example(client: ApiClient, streams: StreamManager) {
/// let badge = NotificationBadge::mount(client, Arc::new(streams));
/// let mut counts = badge.watch();
/// while counts.changed().await.is_ok() {
///     println!("unread: {}", *counts.borrow());
/// }
/// badge.unmount().await;
/// # }
/// ```
#[derive(Debug)]
pub struct NotificationBadge {
    count: watch::Receiver<u64>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl NotificationBadge {
    /// Mount the badge and start reconciling
    ///
    /// Never fails: every error along the way only leaves the count where
    /// it was.
    pub fn mount(client: ApiClient, feed: Arc<dyn NotificationFeed>) -> Self {
        let (tx, count) = watch::channel(0);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reconcile(client, feed, tx, cancel.clone()));
        Self {
            count,
            cancel,
            task: Some(task),
        }
    }

    /// Current unread count
    pub fn count(&self) -> u64 {
        *self.count.borrow()
    }

    /// Receiver that observes every change of the count
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.count.clone()
    }

    /// Whether the reconcile task is still running
    pub fn is_live(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop reconciling and release the stream subscription
    ///
    /// Waits for the task to finish, so once this returns the count will
    /// not change again.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "Badge task ended abnormally");
            }
        }
    }
}

impl Drop for NotificationBadge {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn reconcile(
    client: ApiClient,
    feed: Arc<dyn NotificationFeed>,
    count: watch::Sender<u64>,
    cancel: CancellationToken,
) {
    let snapshot = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        snapshot = client.unread_count() => snapshot,
    };

    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!(error = %e, "Unread snapshot failed; badge stays at default");
            return;
        }
    };

    if cancel.is_cancelled() {
        return;
    }
    count.send_replace(snapshot.unread_count);

    let subscription = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        subscription = feed.subscribe(&snapshot.user_id) => subscription,
    };

    let mut subscription = match subscription {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::debug!(error = %e, user_id = %snapshot.user_id, "Notification subscribe failed");
            return;
        }
    };

    loop {
        let update = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            update = subscription.recv() => update,
        };

        match update {
            Some(update) => {
                count.send_modify(|value| *value = apply_update(*value, &update));
            }
            None => break,
        }
    }
}
