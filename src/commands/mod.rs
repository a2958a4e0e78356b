/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `session`: login, logout and status
- `notifications`: one-shot unread count and the live badge
- `request`: authenticated passthrough requests

Handlers share an [`AppContext`] built from the loaded configuration.
Failures are returned to `main`, which classifies them into the user-facing
copy.
*/

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::session::LogoutSlot;
use crate::storage::SessionStore;

/// Everything a command needs to talk to the backend
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// Persisted session state
    pub store: Arc<SessionStore>,
    /// Authenticated API client
    pub client: ApiClient,
    /// Logout callback slot for this process
    pub logout: LogoutSlot,
}

impl AppContext {
    /// Open the configured store and build the client
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the client cannot
    /// be built from `config.api`.
    pub fn from_config(config: Config) -> Result<Self> {
        let store = Arc::new(SessionStore::open(&config.storage)?);
        let client = ApiClient::new(&config.api, Arc::clone(&store))?;
        Ok(Self {
            config,
            store,
            client,
            logout: LogoutSlot::new(),
        })
    }
}

/// Session command(s)
pub mod session {
    use super::*;
    use crate::session::SessionState;

    /// Store a bearer credential
    ///
    /// The token is persisted as-is; the backend validates it on first use.
    pub async fn login(config: Config, token: String) -> Result<()> {
        let ctx = AppContext::from_config(config)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(
                crate::error::RoomletError::Config("token cannot be empty".to_string()).into(),
            );
        }

        ctx.store.set_token(token)?;
        if !ctx.store.has_onboarded()? {
            ctx.store.mark_onboarded()?;
        }
        tracing::info!("Session credential stored");
        println!("Logged in.");
        Ok(())
    }

    /// End the session on the backend and locally
    pub async fn logout(config: Config) -> Result<()> {
        let ctx = AppContext::from_config(config)?;
        ctx.logout.register(|| println!("Logged out."));
        crate::session::logout(&ctx.client, &ctx.logout).await
    }

    /// Print the current session state
    pub async fn status(config: Config) -> Result<()> {
        let ctx = AppContext::from_config(config)?;
        let state = SessionState::current(&ctx.store)?;
        let onboarded = ctx.store.has_onboarded()?;

        match state {
            SessionState::Authenticated => println!("Session: authenticated"),
            SessionState::Unauthenticated => println!("Session: not logged in"),
        }
        println!("Onboarded: {}", if onboarded { "yes" } else { "no" });
        println!("Backend: {}", ctx.client.base_url());
        Ok(())
    }
}

/// Notification command(s)
pub mod notifications {
    use super::*;
    use crate::notifications::NotificationBadge;
    use crate::session::{LoggingNotice, SessionGuard};
    use crate::stream::StreamManager;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Fetch and print the unread count once
    pub async fn unread(config: Config) -> Result<()> {
        let ctx = AppContext::from_config(config)?;
        let snapshot = ctx.client.unread_count().await?;
        println!("Unread: {}", snapshot.unread_count);
        Ok(())
    }

    /// Mount the badge and print every change of the count
    ///
    /// Runs until `seconds` elapse, Ctrl-C, the badge stops, or the backend
    /// invalidates the session.
    pub async fn watch(config: Config, seconds: Option<u64>) -> Result<()> {
        let ctx = AppContext::from_config(config)?;
        let streams = StreamManager::from_config(&ctx.config.stream, &ctx.config.api.base_url)?;

        let stop = CancellationToken::new();
        let on_logout = stop.clone();
        ctx.logout.register(move || on_logout.cancel());
        let guard = SessionGuard::attach(&ctx.client, Arc::new(LoggingNotice), ctx.logout.clone());

        let badge = NotificationBadge::mount(ctx.client.clone(), Arc::new(streams));
        let mut counts = badge.watch();

        let deadline = async {
            match seconds {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        println!("Unread: {}", *counts.borrow_and_update());
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = &mut ctrl_c => break,
                _ = stop.cancelled() => break,
                changed = counts.changed() => {
                    if changed.is_err() {
                        tracing::info!("Notification badge stopped");
                        break;
                    }
                    println!("Unread: {}", *counts.borrow_and_update());
                }
            }
        }

        badge.unmount().await;
        // A 401 on the snapshot stops the badge before the guard may have
        // seen it; shutdown still runs the logout for it.
        guard.shutdown().await;
        ctx.logout.clear();
        if stop.is_cancelled() {
            println!("Logged out.");
        }
        Ok(())
    }
}

/// Request command(s)
pub mod request {
    use super::*;
    use crate::error::RoomletError;
    use reqwest::Method;

    /// Send an authenticated request and print the response body
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `method` - HTTP verb, case-insensitive
    /// * `path` - Path relative to the API base URL
    /// * `body` - Optional JSON body text
    pub async fn run_request(
        config: Config,
        method: String,
        path: String,
        body: Option<String>,
    ) -> Result<()> {
        let method = parse_method(&method)?;
        let body = match body {
            Some(text) => Some(
                serde_json::from_str::<serde_json::Value>(&text).map_err(RoomletError::from)?,
            ),
            None => None,
        };

        let ctx = AppContext::from_config(config)?;
        let response = ctx
            .client
            .request(method, &path, body.as_ref(), None)
            .await?;

        tracing::debug!(status = response.status.as_u16(), "Request completed");
        match response.json::<serde_json::Value>() {
            Ok(json) => println!(
                "{}",
                serde_json::to_string_pretty(&json).map_err(RoomletError::from)?
            ),
            Err(_) => println!("{}", response.text()),
        }
        Ok(())
    }

    pub(crate) fn parse_method(method: &str) -> Result<Method> {
        Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|_| {
            RoomletError::Config(format!("invalid HTTP method: {}", method)).into()
        })
    }
}
