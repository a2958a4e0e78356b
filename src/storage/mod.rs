//! Local persisted key-value state
//!
//! The app keeps two values on the device: the session bearer credential
//! (`userToken`) and the first-run sentinel (`hasOnboarded`). Both live in a
//! [`KeyValueStore`]; [`SessionStore`] is the typed accessor the rest of the
//! crate goes through.
//!
//! Backends:
//!
//! - [`KeyringStore`] -- OS credential store (default on devices)
//! - [`FileStore`] -- JSON map on disk
//! - [`MemoryStore`] -- process memory (tests, ephemeral sessions)

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub mod file;
pub mod keychain;
pub mod memory;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

/// Storage key for the session bearer credential
pub const USER_TOKEN_KEY: &str = "userToken";

/// Storage key for the first-run onboarding sentinel
pub const HAS_ONBOARDED_KEY: &str = "hasOnboarded";

/// A string-to-string persistent store
///
/// Implementations must treat removing an absent key as success so that
/// repeated session teardown stays idempotent.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; a no-op when absent
    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed access to the session-related keys
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use roomlet::storage::{MemoryStore, SessionStore};
///
/// let store = SessionStore::new(Arc::new(MemoryStore::new()));
/// assert!(store.token().unwrap().is_none());
///
/// store.set_token("abc123").unwrap();
/// assert_eq!(store.token().unwrap().as_deref(), Some("abc123"));
///
/// store.clear_token().unwrap();
/// store.clear_token().unwrap();
/// assert!(store.token().unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Wrap a key-value backend
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Open the backend selected by configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the file backend path cannot be resolved or the
    /// existing file is unreadable.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let backend: Arc<dyn KeyValueStore> = match config.backend {
            StorageBackend::Keyring => Arc::new(KeyringStore::new()),
            StorageBackend::File => Arc::new(FileStore::open(config.file_path()?)?),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        tracing::debug!(backend = ?config.backend, "Opened session store");
        Ok(Self::new(backend))
    }

    /// Current bearer credential, if any
    ///
    /// Empty strings are treated as absent.
    pub fn token(&self) -> Result<Option<String>> {
        Ok(self
            .backend
            .get(USER_TOKEN_KEY)?
            .filter(|token| !token.is_empty()))
    }

    /// Persist a bearer credential after login or verification
    pub fn set_token(&self, token: &str) -> Result<()> {
        self.backend.set(USER_TOKEN_KEY, token)
    }

    /// Remove the bearer credential; idempotent
    pub fn clear_token(&self) -> Result<()> {
        self.backend.remove(USER_TOKEN_KEY)
    }

    /// Whether first-run onboarding has been completed
    pub fn has_onboarded(&self) -> Result<bool> {
        Ok(self.backend.get(HAS_ONBOARDED_KEY)?.as_deref() == Some("true"))
    }

    /// Record that onboarding has been completed
    pub fn mark_onboarded(&self) -> Result<()> {
        self.backend.set(HAS_ONBOARDED_KEY, "true")
    }
}
