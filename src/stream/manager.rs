//! Shared, reference-counted stream connections
//!
//! [`StreamManager`] keeps at most one WebSocket per user id. The first
//! [`StreamManager::subscribe`] for a user spawns the connection task; later
//! subscribers attach to the same broadcast of updates. Every
//! [`Subscription`] holds a lease, and releasing the last lease cancels the
//! task, which sends `leave` and a close frame before exiting.
//!
//! The connection task reconnects on its own: after a failed connect or a
//! dropped socket it waits (starting at `reconnect_delay_ms`, doubling up to
//! `reconnect_delay_max_ms`) and joins again. Stream failures are never
//! surfaced to subscribers; the badge simply goes stale until the socket is
//! back. Debug builds log them at `warn`, release builds at `debug`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::{Result, RoomletError};
use crate::stream::protocol::{self, NotificationUpdate};
use crate::stream::{NotificationFeed, Subscription};

/// Per-connection update buffer
const UPDATE_CAPACITY: usize = 256;

/// Shares one event-stream connection per user between subscribers
///
/// # Examples
///
/// ```no_run
/// use roomlet::config::StreamConfig;
/// use roomlet::stream::{NotificationFeed, StreamManager};
///
/// # async fn example() -> roomlet::Result<()> {
/// let url = url::Url::parse("ws://localhost:3000/notifications")?;
/// let manager = StreamManager::new(url, StreamConfig::default());
///
/// let mut sub = manager.subscribe("u1").await?;
/// while let Some(update) = sub.recv().await {
///     println!("{:?}", update);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StreamManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    url: url::Url,
    config: StreamConfig,
    connections: Mutex<HashMap<String, SharedConnection>>,
}

#[derive(Debug)]
struct SharedConnection {
    leases: usize,
    updates: broadcast::Sender<NotificationUpdate>,
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let connections = self
            .connections
            .get_mut()
            .unwrap_or_else(|e| e.into_inner());
        for conn in connections.values() {
            conn.shutdown.cancel();
        }
    }
}

/// Keeps a shared connection open while held
#[derive(Debug)]
pub(crate) struct Lease {
    manager: Weak<Inner>,
    user_id: String,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(inner) = self.manager.upgrade() else {
            return;
        };
        let mut connections = inner
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let last = match connections.get_mut(&self.user_id) {
            Some(conn) => {
                conn.leases = conn.leases.saturating_sub(1);
                conn.leases == 0
            }
            None => false,
        };

        if last {
            if let Some(conn) = connections.remove(&self.user_id) {
                tracing::debug!(user_id = %self.user_id, "Last subscriber left; closing stream");
                conn.shutdown.cancel();
            }
        }
    }
}

impl StreamManager {
    /// Create a manager for the stream at `url`
    pub fn new(url: url::Url, config: StreamConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                url,
                config,
                connections: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create a manager from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the stream URL cannot be resolved.
    pub fn from_config(config: &StreamConfig, api_base_url: &str) -> Result<Self> {
        let url = config.resolve_url(api_base_url)?;
        Ok(Self::new(url, config.clone()))
    }

    /// Stream endpoint
    pub fn url(&self) -> &url::Url {
        &self.inner.url
    }

    /// Number of open (or reconnecting) connections
    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of live subscriptions for `user_id`
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.lock().get(user_id).map(|c| c.leases).unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedConnection>> {
        self.inner
            .connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn attach(&self, user_id: &str) -> Subscription {
        let mut connections = self.lock();
        let conn = connections.entry(user_id.to_string()).or_insert_with(|| {
            let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
            let shutdown = CancellationToken::new();
            tracing::debug!(user_id, url = %self.inner.url, "Opening notification stream");
            tokio::spawn(run_connection(
                self.inner.url.clone(),
                user_id.to_string(),
                self.inner.config.clone(),
                updates.clone(),
                shutdown.clone(),
            ));
            SharedConnection {
                leases: 0,
                updates,
                shutdown,
            }
        });

        conn.leases += 1;
        let rx = conn.updates.subscribe();
        Subscription::leased(
            rx,
            Lease {
                manager: Arc::downgrade(&self.inner),
                user_id: user_id.to_string(),
            },
        )
    }
}

#[async_trait::async_trait]
impl NotificationFeed for StreamManager {
    async fn subscribe(&self, user_id: &str) -> Result<Subscription> {
        if user_id.is_empty() {
            return Err(RoomletError::Stream("cannot join an empty user channel".to_string()).into());
        }
        Ok(self.attach(user_id))
    }
}

/// How a connected session ended
enum Closed {
    /// The last subscriber left
    Shutdown,
    /// The server closed the socket
    Remote,
}

fn report_stream_error(user_id: &str, error: &dyn std::fmt::Display) {
    if cfg!(debug_assertions) {
        tracing::warn!(user_id, error = %error, "Notification stream error");
    } else {
        tracing::debug!(user_id, error = %error, "Notification stream error");
    }
}

async fn run_connection(
    url: url::Url,
    user_id: String,
    config: StreamConfig,
    updates: broadcast::Sender<NotificationUpdate>,
    shutdown: CancellationToken,
) {
    let mut delay = config.reconnect_delay();

    loop {
        let attempt = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            attempt = tokio_tungstenite::connect_async(url.as_str()) => attempt,
        };

        match attempt {
            Ok((socket, _)) => {
                tracing::debug!(user_id = %user_id, "Notification stream connected");
                delay = config.reconnect_delay();
                match drive(socket, &user_id, &updates, &shutdown).await {
                    Ok(Closed::Shutdown) => return,
                    Ok(Closed::Remote) => report_stream_error(&user_id, &"closed by server"),
                    Err(e) => report_stream_error(&user_id, &e),
                }
            }
            Err(e) => report_stream_error(&user_id, &e),
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = next_delay(delay, config.reconnect_delay_max());
    }
}

fn next_delay(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

async fn drive<S>(
    socket: tokio_tungstenite::WebSocketStream<S>,
    user_id: &str,
    updates: &broadcast::Sender<NotificationUpdate>,
    shutdown: &CancellationToken,
) -> Result<Closed>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut frames) = socket.split();

    sink.send(Message::text(protocol::encode_join(user_id)?))
        .await
        .map_err(|e| RoomletError::Stream(format!("join failed: {}", e)))?;

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                // Best effort: the server also drops the channel on close.
                let _ = sink.send(Message::text(protocol::encode_leave(user_id)?)).await;
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
                return Ok(Closed::Shutdown);
            }
            frame = frames.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Some(update) = protocol::decode_update(text.as_str()) {
                    // No receivers only happens mid-teardown.
                    let _ = updates.send(update);
                }
            }
            Some(Ok(Message::Close(_))) | None => return Ok(Closed::Remote),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(RoomletError::Stream(e.to_string()).into()),
        }
    }
}
