//! Key-value persistence via OS keyring
//!
//! Each key is stored as its own keyring entry under the `roomlet`
//! service, with the key name as the account. The keyring is stateless;
//! [`KeyringStore`] only carries the service name.

use crate::error::{Result, RoomletError};
use crate::storage::KeyValueStore;

/// Default keyring service name
pub const DEFAULT_SERVICE: &str = "roomlet";

/// Accessor for the OS native keyring
///
/// # Examples
///
/// ```no_run
/// use roomlet::storage::{KeyValueStore, KeyringStore};
///
/// let store = KeyringStore::new();
/// store.set("userToken", "abc123").unwrap();
/// assert_eq!(store.get("userToken").unwrap().as_deref(), Some("abc123"));
/// ```
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Store under the default `roomlet` service
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    /// Store under a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Keyring service name in use
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, key).map_err(RoomletError::Keyring)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(RoomletError::Keyring(e).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(RoomletError::Keyring)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(RoomletError::Keyring(e).into()),
        }
    }
}
