//! The single logout-callback slot
//!
//! At most one callback is registered at a time; registering again
//! replaces it. The slot is a value handed to whoever needs to end a
//! session, never a global.

use std::sync::{Arc, RwLock};

/// Callback run when a session ends
pub type LogoutCallback = Arc<dyn Fn() + Send + Sync>;

/// Shared slot holding the current logout callback
///
/// Clones share the same slot.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use roomlet::session::LogoutSlot;
///
/// let slot = LogoutSlot::new();
/// assert!(!slot.invoke());
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let c = Arc::clone(&calls);
/// slot.register(move || {
///     c.fetch_add(1, Ordering::SeqCst);
/// });
/// assert!(slot.invoke());
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct LogoutSlot {
    callback: Arc<RwLock<Option<LogoutCallback>>>,
}

impl LogoutSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback, replacing any previous one
    pub fn register<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self.callback.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(callback));
    }

    /// Remove the registered callback
    pub fn clear(&self) {
        let mut slot = self.callback.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Whether a callback is registered
    pub fn is_registered(&self) -> bool {
        self.callback
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Run the registered callback
    ///
    /// Returns `false` without doing anything when the slot is empty. The
    /// lock is released before the callback runs, so the callback may
    /// re-register.
    pub fn invoke(&self) -> bool {
        let callback = self
            .callback
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => {
                tracing::debug!("Logout requested with no callback registered");
                false
            }
        }
    }
}

impl std::fmt::Debug for LogoutSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogoutSlot")
            .field("registered", &self.is_registered())
            .finish()
    }
}
