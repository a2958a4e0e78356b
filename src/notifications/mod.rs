//! Unread-notification badge
//!
//! The unread count is a snapshot fetched once from the backend plus a
//! left fold of the stream updates received after it. `read` updates floor
//! at zero, so the order of updates matters: `insert(a)` then `read(b)` is
//! not the same as `read(b)` then `insert(a)` when `b` exceeds the count.

use crate::stream::{NotificationUpdate, UpdateKind};

pub mod badge;

pub use badge::NotificationBadge;

/// Apply one update to a count
///
/// # Examples
///
/// ```
/// use roomlet::notifications::apply_update;
/// use roomlet::stream::NotificationUpdate;
///
/// assert_eq!(apply_update(5, &NotificationUpdate::insert(2)), 7);
/// assert_eq!(apply_update(7, &NotificationUpdate::read(10)), 0);
/// ```
pub fn apply_update(count: u64, update: &NotificationUpdate) -> u64 {
    match update.kind {
        UpdateKind::Insert => count.saturating_add(update.delta),
        UpdateKind::Read => count.saturating_sub(update.delta),
        UpdateKind::Other(_) => count,
    }
}

/// Fold a sequence of updates onto an initial count, in order
pub fn apply_all<'a, I>(initial: u64, updates: I) -> u64
where
    I: IntoIterator<Item = &'a NotificationUpdate>,
{
    updates
        .into_iter()
        .fold(initial, |count, update| apply_update(count, update))
}
