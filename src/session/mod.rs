//! Session lifecycle: state, events, logout
//!
//! The API client only consumes the session credential. It never creates
//! one, and it reports invalidation as a [`SessionEvent`] instead of
//! reaching into the UI. [`guard::SessionGuard`] is the UI-side subscriber
//! that shows the expiry notice and runs the registered logout callback.

use chrono::{DateTime, Utc};

use crate::api::ApiClient;
use crate::error::Result;
use crate::storage::SessionStore;

pub mod guard;
pub mod logout;

pub use guard::{LoggingNotice, SessionGuard, SessionNotice};
pub use logout::{LogoutCallback, LogoutSlot};

/// Authentication state derived from the stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A bearer credential is stored
    Authenticated,
    /// No bearer credential is stored
    Unauthenticated,
}

impl SessionState {
    /// Derive the current state from the session store
    pub fn current(store: &SessionStore) -> Result<Self> {
        Ok(match store.token()? {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Unauthenticated,
        })
    }
}

/// Session lifecycle notifications published by [`ApiClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend answered 401; the credential has already been cleared
    Invalidated {
        /// Path of the request that was rejected
        path: String,
        /// When the rejection was observed
        at: DateTime<Utc>,
    },
    /// The user logged out explicitly
    LoggedOut,
}

/// Explicit user logout
///
/// Tells the backend (best effort, only when a credential is stored), then
/// clears the local credential and invokes the logout callback whatever the
/// backend said. Safe to call repeatedly.
pub async fn logout(client: &ApiClient, slot: &LogoutSlot) -> Result<()> {
    if client.store().token()?.is_some() {
        if let Err(e) = client.logout().await {
            tracing::warn!(error = %e, "Backend logout failed; clearing local session anyway");
        }
    }

    client.store().clear_token()?;
    client.publish(SessionEvent::LoggedOut);
    slot.invoke();
    tracing::info!("Logged out");
    Ok(())
}
