//! Authenticated API client
//!
//! Every backend call goes through [`ApiClient::request`]. Immediately
//! before dispatch the stored session credential is read and, when present,
//! sent as `Authorization: Bearer <token>`. A `401 Unauthorized` from any
//! endpoint clears the stored credential and publishes
//! [`SessionEvent::Invalidated`]; the error is still returned to the caller.
//! Every other failure is returned untouched, without retries.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::ApiConfig;
use crate::error::{Result, RoomletError};
use crate::session::SessionEvent;
use crate::storage::SessionStore;

/// Capacity of the session event channel
const SESSION_EVENT_CAPACITY: usize = 32;

/// A successful (2xx) backend response, body unmodified
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body bytes
    pub body: Bytes,
}

impl ApiResponse {
    /// Deserialize the body as JSON
    ///
    /// # Errors
    ///
    /// Returns [`RoomletError::Serialization`] if the body is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body).map_err(RoomletError::from)?)
    }

    /// Body as UTF-8 text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client that owns the session contract with the backend
///
/// Cheap to clone; clones share the connection pool, the session store and
/// the session event channel.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use roomlet::api::ApiClient;
/// use roomlet::config::ApiConfig;
/// use roomlet::storage::{MemoryStore, SessionStore};
///
/// # async fn example() -> roomlet::Result<()> {
/// let store = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
/// store.set_token("abc123")?;
///
/// let client = ApiClient::new(&ApiConfig::default(), store)?;
/// let unread = client.unread_count().await?;
/// println!("{} unread for {}", unread.unread_count, unread.user_id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: url::Url,
    store: Arc<SessionStore>,
    session_events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Build a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &ApiConfig, store: Arc<SessionStore>) -> Result<Self> {
        let base_url = url::Url::parse(&config.base_url).map_err(RoomletError::from)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RoomletError::Http)?;
        let (session_events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url,
            store,
            session_events,
        })
    }

    /// Base URL all paths are resolved against
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Session store the credential is read from
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // No subscribers is fine: nobody is showing UI.
        let _ = self.session_events.send(event);
    }

    fn endpoint(&self, path: &str) -> Result<url::Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(url::Url::parse(&format!("{}/{}", base, path)).map_err(RoomletError::from)?)
    }

    /// Perform a request against the backend
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP verb
    /// * `path` - Path relative to the base URL (leading `/` optional)
    /// * `body` - Optional JSON body
    /// * `extra_headers` - Headers applied after the bearer header
    ///
    /// # Errors
    ///
    /// - [`RoomletError::Unauthorized`] on 401, after the stored credential
    ///   has been cleared and [`SessionEvent::Invalidated`] published
    /// - [`RoomletError::ServerRejected`] on any other non-2xx status
    /// - [`RoomletError::Http`] when no response arrived (network failure
    ///   or the client-side timeout)
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        extra_headers: Option<&HeaderMap>,
    ) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        let mut req = self.http.request(method.clone(), url);

        match self.store.token() {
            Ok(Some(token)) => req = req.bearer_auth(token),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session credential; sending unauthenticated")
            }
        }

        if let Some(headers) = extra_headers {
            req = req.headers(headers.clone());
        }

        if let Some(body) = body {
            req = req.json(body);
        }

        tracing::debug!(method = %method, path, "API request");

        let response = req.send().await.map_err(|e| {
            tracing::debug!(method = %method, path, error = %e, "API request failed without response");
            RoomletError::Http(e)
        })?;

        let status = response.status();
        tracing::debug!(method = %method, path, status = status.as_u16(), "API response");

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session(path);
            return Err(RoomletError::Unauthorized {
                path: path.to_string(),
            }
            .into());
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(RoomletError::Http)?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            return Err(RoomletError::ServerRejected {
                status: status.as_u16(),
                message: extract_message(&text),
                body: text,
            }
            .into());
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn invalidate_session(&self, path: &str) {
        tracing::warn!(path, "Backend rejected session credential");
        if let Err(e) = self.store.clear_token() {
            tracing::warn!(error = %e, "Failed to clear session credential");
        }
        self.publish(SessionEvent::Invalidated {
            path: path.to_string(),
            at: Utc::now(),
        });
    }

    /// `GET` a JSON resource
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None, None).await?.json()
    }

    /// Send a JSON body and deserialize the JSON reply
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(RoomletError::from)?;
        self.request(method, path, Some(&body), None).await?.json()
    }
}

/// Pull a human-readable `message` out of an error body
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn client(base: &str) -> ApiClient {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
        let config = ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        };
        ApiClient::new(&config, store).unwrap()
    }

    #[test]
    fn test_endpoint_joins_with_and_without_slashes() {
        let c = client("http://localhost:3000/");
        assert_eq!(
            c.endpoint("/api/my-properties").unwrap().as_str(),
            "http://localhost:3000/api/my-properties"
        );
        assert_eq!(
            c.endpoint("api/my-properties").unwrap().as_str(),
            "http://localhost:3000/api/my-properties"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = client("https://api.roomlet.test/v2");
        assert_eq!(
            c.endpoint("/api/reviews").unwrap().as_str(),
            "https://api.roomlet.test/v2/api/reviews"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(ApiClient::new(&config, store).is_err());
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(r#"{"message":"Room unavailable"}"#).as_deref(),
            Some("Room unavailable")
        );
        assert!(extract_message(r#"{"error":"x"}"#).is_none());
        assert!(extract_message(r#"{"message":42}"#).is_none());
        assert!(extract_message("<html>").is_none());
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let c = client("http://localhost:3000");
        c.publish(SessionEvent::LoggedOut);
    }

    #[test]
    fn test_response_json_and_text() {
        let resp = ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(br#"{"ok":true}"#),
        };
        let v: serde_json::Value = resp.json().unwrap();
        assert_eq!(v["ok"], true);
        assert_eq!(resp.text(), r#"{"ok":true}"#);
    }
}
