//! Wire format of the notification event stream
//!
//! Every WebSocket text frame is one JSON envelope:
//!
//! ```text
//! {"event": "join", "data": "u1"}                                    client -> server
//! {"event": "leave", "data": "u1"}                                   client -> server
//! {"event": "notification_update", "data": {"type": "insert", "delta": 2}}   server -> client
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Client asks to receive the events of one user channel
pub const JOIN_EVENT: &str = "join";

/// Client stops receiving a user channel
pub const LEAVE_EVENT: &str = "leave";

/// Server reports an unread-count change
pub const NOTIFICATION_UPDATE_EVENT: &str = "notification_update";

/// One frame on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Direction of an unread-count change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// New notifications arrived
    Insert,
    /// Notifications were marked read
    Read,
    /// A kind this client does not know; ignored
    Other(String),
}

/// A single unread-count change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationUpdate {
    /// Direction
    pub kind: UpdateKind,
    /// Magnitude
    pub delta: u64,
}

impl NotificationUpdate {
    /// An `insert` of `delta`
    pub fn insert(delta: u64) -> Self {
        Self {
            kind: UpdateKind::Insert,
            delta,
        }
    }

    /// A `read` of `delta`
    pub fn read(delta: u64) -> Self {
        Self {
            kind: UpdateKind::Read,
            delta,
        }
    }
}

#[derive(Deserialize)]
struct RawUpdate {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: i64,
}

impl From<RawUpdate> for NotificationUpdate {
    fn from(raw: RawUpdate) -> Self {
        let kind = match raw.kind.as_str() {
            "insert" => UpdateKind::Insert,
            "read" => UpdateKind::Read,
            _ => UpdateKind::Other(raw.kind),
        };
        // Negative deltas would let an insert shrink the count.
        let delta = u64::try_from(raw.delta).unwrap_or(0);
        Self { kind, delta }
    }
}

/// Encode a `join` frame for `user_id`
pub fn encode_join(user_id: &str) -> Result<String> {
    encode(JOIN_EVENT, user_id)
}

/// Encode a `leave` frame for `user_id`
pub fn encode_leave(user_id: &str) -> Result<String> {
    encode(LEAVE_EVENT, user_id)
}

fn encode(event: &str, user_id: &str) -> Result<String> {
    Ok(serde_json::to_string(&Envelope {
        event: event.to_string(),
        data: serde_json::Value::String(user_id.to_string()),
    })?)
}

/// Decode a server frame into an update
///
/// Returns `None` for other events and for frames that do not parse.
///
/// # Examples
///
/// ```
/// use roomlet::stream::protocol::{decode_update, NotificationUpdate};
///
/// let frame = r#"{"event":"notification_update","data":{"type":"insert","delta":2}}"#;
/// assert_eq!(decode_update(frame), Some(NotificationUpdate::insert(2)));
/// assert_eq!(decode_update(r#"{"event":"typing","data":{}}"#), None);
/// ```
pub fn decode_update(frame: &str) -> Option<NotificationUpdate> {
    let envelope: Envelope = match serde_json::from_str(frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::trace!(error = %e, "Ignoring malformed stream frame");
            return None;
        }
    };

    if envelope.event != NOTIFICATION_UPDATE_EVENT {
        tracing::trace!(event = %envelope.event, "Ignoring stream event");
        return None;
    }

    match serde_json::from_value::<RawUpdate>(envelope.data) {
        Ok(raw) => Some(raw.into()),
        Err(e) => {
            tracing::trace!(error = %e, "Ignoring malformed notification_update payload");
            None
        }
    }
}
