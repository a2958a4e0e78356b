//! Roomlet - room-rental marketplace client library
//!
//! This library provides the session and notification core of the Roomlet
//! client: the authenticated API client, persisted session state, the
//! logout hook, and the live unread-notification badge.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Authenticated HTTP client and typed endpoint wrappers
//! - `session`: Session state, invalidation events, logout callback slot
//! - `storage`: Persisted key-value state (keyring, file, memory)
//! - `stream`: Per-user notification event stream
//! - `notifications`: Unread-count reconciliation and the badge
//! - `config`: Configuration management and validation
//! - `error`: Error types, result alias, error classification
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use roomlet::{ApiClient, Config, NotificationBadge, SessionStore, StreamManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store = Arc::new(SessionStore::open(&config.storage)?);
//!     let client = ApiClient::new(&config.api, store)?;
//!     let streams = StreamManager::from_config(&config.stream, &config.api.base_url)?;
//!
//!     let badge = NotificationBadge::mount(client, Arc::new(streams));
//!     println!("unread: {}", badge.count());
//!     badge.unmount().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notifications;
pub mod session;
pub mod storage;
pub mod stream;

// Re-export commonly used types
pub use api::{ApiClient, ApiResponse};
pub use config::Config;
pub use error::{classify, ErrorKind, Result, RoomletError};
pub use notifications::NotificationBadge;
pub use session::{LogoutSlot, SessionEvent, SessionGuard, SessionState};
pub use storage::SessionStore;
pub use stream::{NotificationFeed, StreamManager};
